use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::contingency::ContingencyCounts;

/// Reported in place of a coefficient that is undefined for the given
/// counts (division by zero, square root of a negative number, 0/0).
pub const UNDEFINED: f64 = 1.000001;

/// The presence/absence dissimilarity coefficients, in output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Coefficient {
    Anderberg,
    Antidice,
    Dice,
    Gower,
    Hamman,
    Hamming,
    Jaccard,
    Kulczynski,
    Matching,
    Ochiai,
    Phi,
    Russel,
    Sneath,
    Tanimoto,
    Yule,
}

impl Coefficient {
    pub fn name(self) -> &'static str {
        match self {
            Coefficient::Anderberg => "Anderberg",
            Coefficient::Antidice => "Antidice",
            Coefficient::Dice => "Dice",
            Coefficient::Gower => "Gower",
            Coefficient::Hamman => "Hamman",
            Coefficient::Hamming => "Hamming",
            Coefficient::Jaccard => "Jaccard",
            Coefficient::Kulczynski => "Kulczynski",
            Coefficient::Matching => "Matching",
            Coefficient::Ochiai => "Ochiai",
            Coefficient::Phi => "Phi",
            Coefficient::Russel => "Russel",
            Coefficient::Sneath => "Sneath",
            Coefficient::Tanimoto => "Tanimoto",
            Coefficient::Yule => "Yule",
        }
    }

    pub fn all() -> impl Iterator<Item = Coefficient> {
        COEFFICIENTS.iter().map(|(coefficient, _)| *coefficient)
    }

    fn position(self) -> usize {
        COEFFICIENTS
            .iter()
            .position(|(coefficient, _)| *coefficient == self)
            .unwrap_or(0)
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The contingency counts as floats; every formula works on these.
///
/// Sums and differences that mix the huge absent class with the small
/// observed ones are formed exactly in integers before the conversion,
/// otherwise N − D collapses to 0 for k = 32.
#[derive(Clone, Copy, Debug)]
struct Operands {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    n: f64,
    // A + B + C, i.e. N − D
    observed: f64,
    // A + D
    agree: f64,
    // B + C
    disagree: f64,
    // (A + D) − (B + C)
    balance: f64,
}

impl From<&ContingencyCounts> for Operands {
    fn from(counts: &ContingencyCounts) -> Self {
        let agree = u128::from(counts.a) + counts.d;
        let disagree = u128::from(counts.b) + u128::from(counts.c);
        let balance = if agree >= disagree {
            (agree - disagree) as f64
        } else {
            -((disagree - agree) as f64)
        };
        Operands {
            a: counts.a as f64,
            b: counts.b as f64,
            c: counts.c as f64,
            d: counts.d as f64,
            n: counts.n as f64,
            observed: counts.observed() as f64,
            agree: agree as f64,
            disagree: disagree as f64,
            balance,
        }
    }
}

type Formula = fn(&Operands) -> Option<f64>;

pub const N_COEFFICIENTS: usize = 15;

const COEFFICIENTS: [(Coefficient, Formula); N_COEFFICIENTS] = [
    (Coefficient::Anderberg, anderberg),
    (Coefficient::Antidice, antidice),
    (Coefficient::Dice, dice),
    (Coefficient::Gower, gower),
    (Coefficient::Hamman, hamman),
    (Coefficient::Hamming, hamming),
    (Coefficient::Jaccard, jaccard),
    (Coefficient::Kulczynski, kulczynski),
    (Coefficient::Matching, matching),
    (Coefficient::Ochiai, ochiai),
    (Coefficient::Phi, phi),
    (Coefficient::Russel, russel),
    (Coefficient::Sneath, sneath),
    (Coefficient::Tanimoto, tanimoto),
    (Coefficient::Yule, yule),
];

#[inline]
fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

#[inline]
fn root(x: f64) -> Option<f64> {
    if x < 0.0 {
        None
    } else {
        Some(x.sqrt())
    }
}

// 1 − (A/(A+B) + A/(A+C) + D/(C+D) + D/(B+D)) / 4
fn anderberg(o: &Operands) -> Option<f64> {
    let sum = ratio(o.a, o.a + o.b)?
        + ratio(o.a, o.a + o.c)?
        + ratio(o.d, o.c + o.d)?
        + ratio(o.d, o.b + o.d)?;
    Some(1.0 - sum / 4.0)
}

// 1 − A/(A + 2(B+C))
fn antidice(o: &Operands) -> Option<f64> {
    Some(1.0 - ratio(o.a, o.a + 2.0 * o.disagree)?)
}

// 1 − 2A/(2A + B + C)
fn dice(o: &Operands) -> Option<f64> {
    Some(1.0 - ratio(2.0 * o.a, 2.0 * o.a + o.b + o.c)?)
}

// 1 − A·D/√((A+B)(A+C)(D + B(D+C)))
fn gower(o: &Operands) -> Option<f64> {
    let denominator = root((o.a + o.b) * (o.a + o.c) * (o.d + o.b * (o.d + o.c)))?;
    Some(1.0 - ratio(o.a * o.d, denominator)?)
}

// 1 − ((A + D − B − C)/N)²
fn hamman(o: &Operands) -> Option<f64> {
    Some(1.0 - ratio(o.balance, o.n)?.powi(2))
}

// (B + C)/N
fn hamming(o: &Operands) -> Option<f64> {
    ratio(o.disagree, o.n)
}

// 1 − A/(N − D)
fn jaccard(o: &Operands) -> Option<f64> {
    Some(1.0 - ratio(o.a, o.observed)?)
}

// 1 − (A/(A+B) + A/(A+C)) / 2
fn kulczynski(o: &Operands) -> Option<f64> {
    Some(1.0 - (ratio(o.a, o.a + o.b)? + ratio(o.a, o.a + o.c)?) / 2.0)
}

// 1 − (A + D)/N
fn matching(o: &Operands) -> Option<f64> {
    Some(1.0 - ratio(o.agree, o.n)?)
}

// 1 − A/√((A+B)(A+C))
fn ochiai(o: &Operands) -> Option<f64> {
    Some(1.0 - ratio(o.a, root((o.a + o.b) * (o.a + o.c))?)?)
}

// 1 − ((A·D − B·C)/√((A+B)(A+C)(D+B)(D+C)))²
fn phi(o: &Operands) -> Option<f64> {
    let denominator = root((o.a + o.b) * (o.a + o.c) * (o.d + o.b) * (o.d + o.c))?;
    Some(1.0 - ratio(o.a * o.d - o.b * o.c, denominator)?.powi(2))
}

// 1 − A/N
fn russel(o: &Operands) -> Option<f64> {
    Some(1.0 - ratio(o.a, o.n)?)
}

// 1 − 2(A+D)/(2(A+D) + (B+C))
fn sneath(o: &Operands) -> Option<f64> {
    Some(1.0 - ratio(2.0 * o.agree, 2.0 * o.agree + o.disagree)?)
}

// 1 − (A+D)/((A+D) + 2(B+C))
fn tanimoto(o: &Operands) -> Option<f64> {
    Some(1.0 - ratio(o.agree, o.agree + 2.0 * o.disagree)?)
}

// 1 − ((A·D − B·C)/(A·D + B·C))²
fn yule(o: &Operands) -> Option<f64> {
    Some(1.0 - ratio(o.a * o.d - o.b * o.c, o.a * o.d + o.b * o.c)?.powi(2))
}

fn evaluate(formula: Formula, operands: &Operands) -> f64 {
    formula(operands)
        .filter(|value| value.is_finite())
        .unwrap_or(UNDEFINED)
}

/// A single coefficient, or `UNDEFINED` if it can't be computed.
pub fn dissimilarity(coefficient: Coefficient, counts: &ContingencyCounts) -> f64 {
    let (_, formula) = COEFFICIENTS[coefficient.position()];
    evaluate(formula, &Operands::from(counts))
}

/// Every coefficient for one contingency table, in output order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dissimilarities {
    values: [f64; N_COEFFICIENTS],
}

impl Dissimilarities {
    pub fn new(counts: &ContingencyCounts) -> Self {
        let operands = Operands::from(counts);
        let mut values = [UNDEFINED; N_COEFFICIENTS];
        for (value, (_, formula)) in values.iter_mut().zip(COEFFICIENTS.iter()) {
            *value = evaluate(*formula, &operands);
        }
        Dissimilarities { values }
    }

    pub fn get(&self, coefficient: Coefficient) -> f64 {
        self.values[coefficient.position()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coefficient, f64)> + '_ {
        Coefficient::all().zip(self.values.iter().copied())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl Serialize for Dissimilarities {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(N_COEFFICIENTS))?;
        for (coefficient, value) in self.iter() {
            map.serialize_entry(coefficient.name(), &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn counts(a: u64, b: u64, c: u64, n: u128) -> ContingencyCounts {
        ContingencyCounts::new(a, b, c, n).unwrap()
    }

    fn close(x: f64, y: f64) -> bool {
        (x - y).abs() < 1e-12
    }

    #[test]
    fn test_table_order() {
        let names: Vec<&str> = Coefficient::all().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "Anderberg", "Antidice", "Dice", "Gower", "Hamman", "Hamming", "Jaccard",
                "Kulczynski", "Matching", "Ochiai", "Phi", "Russel", "Sneath", "Tanimoto", "Yule",
            ]
        );
    }

    #[test]
    fn test_known_values() {
        // A=2, B=1, C=1, D=4, N=8
        let d = Dissimilarities::new(&counts(2, 1, 1, 8));
        assert!(close(d.get(Coefficient::Anderberg), 1.0 - (2. / 3. + 2. / 3. + 4. / 5. + 4. / 5.) / 4.));
        assert!(close(d.get(Coefficient::Antidice), 1.0 - 2. / 6.));
        assert!(close(d.get(Coefficient::Dice), 1.0 - 4. / 6.));
        assert!(close(d.get(Coefficient::Hamman), 1.0 - (4. / 8.) * (4. / 8.)));
        assert!(close(d.get(Coefficient::Hamming), 2. / 8.));
        assert!(close(d.get(Coefficient::Jaccard), 1.0 - 2. / 4.));
        assert!(close(d.get(Coefficient::Kulczynski), 1.0 - 2. / 3.));
        assert!(close(d.get(Coefficient::Matching), 1.0 - 6. / 8.));
        assert!(close(d.get(Coefficient::Ochiai), 1.0 - 2. / 3.));
        assert!(close(d.get(Coefficient::Russel), 1.0 - 2. / 8.));
        assert!(close(d.get(Coefficient::Sneath), 1.0 - 12. / 14.));
        assert!(close(d.get(Coefficient::Tanimoto), 1.0 - 6. / 10.));
        assert!(close(d.get(Coefficient::Yule), 1.0 - (7. / 9.) * (7. / 9.)));
    }

    #[test]
    fn test_gower_and_phi_parenthesization() {
        // The prose definitions of these two read differently from the
        // arithmetic; these pin down the grouping that is implemented:
        // Gower's last factor is D + B·(D + C), and Phi squares
        // (A·D − B·C) over the full four-term root.
        let d = Dissimilarities::new(&counts(2, 1, 1, 8));
        let gower = 1.0 - 8.0 / (3.0f64 * 3.0 * (4.0 + 1.0 * 5.0)).sqrt();
        assert!(close(d.get(Coefficient::Gower), gower));
        let phi = 1.0 - (7.0 / (3.0f64 * 3.0 * 5.0 * 5.0).sqrt()).powi(2);
        assert!(close(d.get(Coefficient::Phi), phi));
    }

    #[test]
    fn test_gower_leaves_unit_interval() {
        // With B = C = 0 the grouping above reduces Gower to 1 − √D, so it
        // goes negative as soon as more than one k-mer is absent from both.
        let d = Dissimilarities::new(&counts(4, 0, 0, 8));
        assert_eq!(d.get(Coefficient::Gower), -1.0);
        let d = Dissimilarities::new(&counts(201, 0, 0, 203));
        assert!(close(d.get(Coefficient::Gower), 1.0 - 2f64.sqrt()));
        let d = Dissimilarities::new(&counts(500, 1, 1, 1002));
        assert!(d.get(Coefficient::Gower) < 0.0);
        assert_ne!(d.get(Coefficient::Gower), UNDEFINED);
    }

    #[test]
    fn test_disjoint_jaccard_is_one() {
        let c = counts(0, 3, 5, 256);
        assert_eq!(dissimilarity(Coefficient::Jaccard, &c), 1.0);
        assert_eq!(dissimilarity(Coefficient::Dice, &c), 1.0);
    }

    #[test]
    fn test_ochiai_undefined_only() {
        let c = counts(0, 0, 5, 256);
        let d = Dissimilarities::new(&c);
        assert_eq!(d.get(Coefficient::Dice), 1.0);
        assert_eq!(d.get(Coefficient::Ochiai), UNDEFINED);
        assert_eq!(d.get(Coefficient::Kulczynski), UNDEFINED);
        assert_eq!(d.get(Coefficient::Anderberg), UNDEFINED);
        assert_eq!(d.get(Coefficient::Jaccard), 1.0);
        assert!(close(d.get(Coefficient::Hamming), 5.0 / 256.0));
    }

    #[test]
    fn test_yule_undefined_when_cross_products_vanish() {
        // every k-mer of the universe is shared: A·D + B·C == 0
        let c = counts(4, 0, 0, 4);
        assert_eq!(dissimilarity(Coefficient::Yule, &c), UNDEFINED);
        assert_eq!(dissimilarity(Coefficient::Jaccard, &c), 0.0);
        assert_eq!(dissimilarity(Coefficient::Hamming, &c), 0.0);
    }

    #[test]
    fn test_identical_sets() {
        let d = Dissimilarities::new(&counts(10, 0, 0, 1u128 << 64));
        assert_eq!(d.get(Coefficient::Jaccard), 0.0);
        assert_eq!(d.get(Coefficient::Dice), 0.0);
        assert_eq!(d.get(Coefficient::Hamming), 0.0);
    }

    #[test]
    fn test_serialize_names() {
        let d = Dissimilarities::new(&counts(2, 1, 1, 8));
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json.as_object().unwrap().len(), N_COEFFICIENTS);
        assert_eq!(json["Hamming"], 0.25);
    }

    proptest! {
        #[test]
        fn test_hamming_never_undefined(a in 0u64..1000, b in 0u64..1000, c in 0u64..1000, extra in 0u64..1000) {
            let n = u128::from(a + b + c + extra).max(1);
            let counts = counts(a, b, c, n);
            let hamming = dissimilarity(Coefficient::Hamming, &counts);
            prop_assert_eq!(hamming, (b + c) as f64 / n as f64);
        }

        #[test]
        fn test_coefficients_in_range(a in 0u64..1000, b in 0u64..1000, c in 0u64..1000, extra in 0u64..1000) {
            let n = u128::from(a + b + c + extra).max(1);
            let d = Dissimilarities::new(&counts(a, b, c, n));
            for (coefficient, value) in d.iter() {
                prop_assert!(value.is_finite(), "{} = {}", coefficient, value);
                // Gower as written isn't bounded, see test_gower_leaves_unit_interval
                if coefficient == Coefficient::Gower {
                    continue;
                }
                prop_assert!(
                    value == UNDEFINED || (-1e-9..=1.0 + 1e-9).contains(&value),
                    "{} = {}", coefficient, value
                );
            }
        }
    }
}
