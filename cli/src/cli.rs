use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use clap::{crate_authors, crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use kmerdist::evaluate::{EvalParams, DEFAULT_SKETCH_SIZES};
use kmerdist::histogram::{Alphabet, CountingSource, DumpSource, HistogramSource, KmcSource};
use kmerdist::sketch::MashCommand;

/// Largest k whose 37-symbol universe still fits in 128 bits.
const TEXT_MAX_K: u8 = 24;

pub fn build_cli() -> App<'static, 'static> {
    App::new("kmerdist")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Alignment-free dissimilarity of sequence pairs from k-mer histograms")
        .setting(AppSettings::VersionlessSubcommands)
        .setting(AppSettings::ArgRequiredElseHelp)
        .subcommand(dist_command())
        .subcommand(entropy_command())
}

fn dist_command() -> App<'static, 'static> {
    let mut dist_command = SubCommand::with_name("dist")
        .about("Compare two sequences over a sweep of k-mer lengths")
        .arg(
            Arg::with_name("SEQ_A")
                .help("First sequence (or dump file pattern with `{k}` for `--source dump`)")
                .required(true),
        )
        .arg(
            Arg::with_name("SEQ_B")
                .help("Second sequence (or dump file pattern with `{k}` for `--source dump`)")
                .required(true),
        )
        .arg(
            Arg::with_name("source")
                .long("source")
                .takes_value(true)
                .possible_values(&["kmc", "dump", "count", "text"])
                .default_value("kmc")
                .help("Where the k-mer histograms come from"),
        )
        .arg(
            Arg::with_name("alphabet_size")
                .long("alphabet-size")
                .takes_value(true)
                .help("Number of symbols k-mers are drawn from [default: 4, or 37 for `--source text`]"),
        )
        .arg(
            Arg::with_name("min_k")
                .long("min-k")
                .takes_value(true)
                .default_value("4")
                .help("Smallest k-mer length"),
        )
        .arg(
            Arg::with_name("max_k")
                .long("max-k")
                .takes_value(true)
                .help("Largest k-mer length [default: 32, or 24 for `--source text`]"),
        )
        .arg(
            Arg::with_name("step_k")
                .long("step-k")
                .takes_value(true)
                .default_value("4")
                .help("Step between k-mer lengths"),
        )
        .arg(
            Arg::with_name("sketch_sizes")
                .long("sketch-sizes")
                .takes_value(true)
                .multiple(true)
                .use_delimiter(true)
                .require_delimiter(true)
                .help("Sketch sizes to run mash with [default: 1000,10000,100000]"),
        )
        .arg(
            Arg::with_name("no_sketch")
                .long("no-sketch")
                .help("Don't run mash"),
        )
        .arg(
            Arg::with_name("kmc")
                .long("kmc")
                .takes_value(true)
                .default_value("kmc")
                .help("Path to the kmc binary"),
        )
        .arg(
            Arg::with_name("kmc_dump")
                .long("kmc-dump")
                .takes_value(true)
                .default_value("kmc_dump")
                .help("Path to the kmc_dump binary"),
        )
        .arg(
            Arg::with_name("mash")
                .long("mash")
                .takes_value(true)
                .default_value("mash")
                .help("Path to the mash binary"),
        )
        .arg(
            Arg::with_name("tsv")
                .long("tsv")
                .help("Output a tab-separated table instead of JSON"),
        );
    dist_command = add_output_options(dist_command);
    dist_command
}

fn entropy_command() -> App<'static, 'static> {
    let mut entropy_command = SubCommand::with_name("entropy")
        .about("Report entropy and sampling error of existing histogram dumps")
        .arg(
            Arg::with_name("INPUT")
                .help("Histogram dump file(s), one `KMER COUNT` pair per line")
                .multiple(true)
                .required(true),
        )
        .arg(
            Arg::with_name("tsv")
                .long("tsv")
                .help("Output a tab-separated table instead of JSON"),
        );
    entropy_command = add_output_options(entropy_command);
    entropy_command
}

fn add_output_options<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.arg(
        Arg::with_name("output_file")
            .short("o")
            .long("output")
            .help("Output to this file")
            .takes_value(true),
    )
    .arg(
        Arg::with_name("std_out")
            .short("O")
            .long("std-out")
            .help("Output to stdout ('print to terminal')")
            .conflicts_with("output_file"),
    )
}

pub fn get_int_arg<T: FromStr>(matches: &ArgMatches, key: &str) -> Result<T> {
    let display_key = key.replace('_', "-");
    matches
        .value_of(key)
        .ok_or_else(|| anyhow!("Bad {}", display_key))?
        .parse::<T>()
        .map_err(|_| anyhow!("{} must be a positive integer", display_key))
}

fn is_text(matches: &ArgMatches) -> bool {
    matches.value_of("source") == Some("text")
}

/// mash needs the real sequence files, which `dump` and `text` inputs aren't.
fn source_has_sequences(matches: &ArgMatches) -> bool {
    match matches.value_of("source") {
        Some("dump") | Some("text") => false,
        _ => true,
    }
}

fn sketching_enabled(matches: &ArgMatches) -> bool {
    !matches.is_present("no_sketch") && source_has_sequences(matches)
}

pub fn parse_eval_options(matches: &ArgMatches) -> Result<EvalParams> {
    let text = is_text(matches);
    let alphabet_size: u32 = if matches.occurrences_of("alphabet_size") > 0 {
        get_int_arg(matches, "alphabet_size")?
    } else if text {
        Alphabet::Text.size()
    } else {
        Alphabet::Nucleotide.size()
    };
    let max_k: u8 = if matches.occurrences_of("max_k") > 0 {
        get_int_arg(matches, "max_k")?
    } else if text {
        TEXT_MAX_K
    } else {
        32
    };

    if !source_has_sequences(matches) && matches.occurrences_of("sketch_sizes") > 0 {
        bail!(
            "sketch-sizes can't be used with --source {}",
            matches.value_of("source").unwrap_or_default()
        );
    }
    let sketch_sizes = if !sketching_enabled(matches) {
        Vec::new()
    } else if matches.occurrences_of("sketch_sizes") == 0 {
        DEFAULT_SKETCH_SIZES.to_vec()
    } else {
        matches
            .values_of("sketch_sizes")
            .ok_or_else(|| anyhow!("Bad sketch-sizes"))?
            .map(|s| {
                s.parse::<usize>()
                    .map_err(|_| anyhow!("sketch-sizes must be positive integers"))
            })
            .collect::<Result<Vec<usize>>>()?
    };
    if sketch_sizes.iter().any(|s| *s == 0) {
        bail!("sketch-sizes must be positive integers");
    }

    let params = EvalParams {
        alphabet_size,
        min_k: get_int_arg(matches, "min_k")?,
        max_k,
        step_k: get_int_arg(matches, "step_k")?,
        sketch_sizes,
    };
    params.k_values()?;
    Ok(params)
}

pub fn parse_histogram_source(matches: &ArgMatches) -> Result<Box<dyn HistogramSource>> {
    Ok(match matches.value_of("source").unwrap_or("kmc") {
        "kmc" => Box::new(KmcSource::new(
            Path::new(matches.value_of("kmc").unwrap_or("kmc")),
            Path::new(matches.value_of("kmc_dump").unwrap_or("kmc_dump")),
        )),
        "dump" => Box::new(DumpSource),
        "count" => Box::new(CountingSource::new(Alphabet::Nucleotide)),
        "text" => Box::new(CountingSource::new(Alphabet::Text)),
        other => bail!("Unknown histogram source {}", other),
    })
}

/// The mash wrapper, unless sketching is switched off or the inputs
/// aren't sequence files.
pub fn parse_sketch_tool(matches: &ArgMatches) -> Option<MashCommand> {
    if !sketching_enabled(matches) {
        return None;
    }
    Some(MashCommand::new(Path::new(
        matches.value_of("mash").unwrap_or("mash"),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_dist_matches<T>(args: &[&str], f: impl FnOnce(&ArgMatches) -> T) -> T {
        let mut full = vec!["kmerdist", "dist", "a.fa", "b.fa"];
        full.extend_from_slice(args);
        let matches = build_cli().get_matches_from(full);
        let (_, sub) = matches.subcommand();
        f(sub.unwrap())
    }

    fn dist_matches(args: &[&str]) -> EvalParams {
        with_dist_matches(args, |m| parse_eval_options(m).unwrap())
    }

    #[test]
    fn test_default_params() {
        assert_eq!(dist_matches(&[]), EvalParams::default());
    }

    #[test]
    fn test_text_defaults() {
        let params = dist_matches(&["--source", "text", "--no-sketch"]);
        assert_eq!(params.alphabet_size, 37);
        assert_eq!(params.max_k, TEXT_MAX_K);
        assert!(params.sketch_sizes.is_empty());
    }

    #[test]
    fn test_sketch_sizes() {
        let params = dist_matches(&["--sketch-sizes", "10,20", "--min-k", "8", "--max-k", "16"]);
        assert_eq!(params.sketch_sizes, vec![10, 20]);
        assert_eq!(params.k_values().unwrap(), vec![8, 12, 16]);
    }

    #[test]
    fn test_no_sketching_without_sequences() {
        for &source in &["dump", "text"] {
            let params = dist_matches(&["--source", source]);
            assert!(params.sketch_sizes.is_empty());
            assert!(with_dist_matches(&["--source", source], parse_sketch_tool).is_none());
        }
        assert!(with_dist_matches(&["--source", "count"], parse_sketch_tool).is_some());
        assert!(with_dist_matches(&["--no-sketch"], parse_sketch_tool).is_none());

        let err = with_dist_matches(&["--source", "dump", "--sketch-sizes", "10,20"], |m| {
            parse_eval_options(m).unwrap_err()
        });
        assert!(err.to_string().contains("can't be used with --source dump"));
    }
}
