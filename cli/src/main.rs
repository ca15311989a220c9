use std::fs::File;
use std::io::{stdout, BufReader, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use csv::WriterBuilder;
use log::error;
use serde_json::json;

use kmerdist::entropy::sequence_entropy;
use kmerdist::histogram::read_dump;
use kmerdist::record::{DissimilarityRecord, SequenceEntropy};
use kmerdist::sketch::SketchTool;
use kmerdist::{PairEvaluator, SequencePair};

use crate::cli::{parse_eval_options, parse_histogram_source, parse_sketch_tool};

mod cli;

fn output_to<F>(output_fn: F, output: Option<&str>, extension: &str) -> Result<()>
where
    F: Fn(&mut dyn Write) -> Result<()>,
{
    match output {
        None => {
            let mut out = stdout();
            output_fn(&mut out)?;
        }
        Some(o) => {
            // if the filename doesn't have the right extension
            // add it on
            let filename = String::from(o);
            let out_filename = if filename.ends_with(extension) {
                filename
            } else {
                filename + extension
            };

            let mut out = File::create(&out_filename)
                .context(format!("unable to create '{}'", out_filename))?;
            output_fn(&mut out)?;
        }
    };
    Ok(())
}

fn write_tsv(writer: &mut dyn Write, header: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut tsv = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    tsv.write_record(header)?;
    for row in rows {
        tsv.write_record(row)?;
    }
    tsv.flush()?;
    Ok(())
}

fn output_extension(matches: &ArgMatches) -> &'static str {
    if matches.is_present("tsv") {
        ".tsv"
    } else {
        ".json"
    }
}

fn run_dist(matches: &ArgMatches) -> Result<()> {
    let params = parse_eval_options(matches)?;
    let source = parse_histogram_source(matches)?;
    let mash = parse_sketch_tool(matches);

    let seq_a = matches.value_of("SEQ_A").ok_or_else(|| anyhow!("Bad SEQ_A"))?;
    let seq_b = matches.value_of("SEQ_B").ok_or_else(|| anyhow!("Bad SEQ_B"))?;
    let pairs = vec![SequencePair::new(Path::new(seq_a), Path::new(seq_b))];

    let mut evaluator = PairEvaluator::new(params, source.as_ref());
    if let Some(tool) = mash.as_ref() {
        evaluator = evaluator.with_sketch_tool(tool as &dyn SketchTool);
    }
    let evaluations = evaluator.evaluate_batch(&pairs)?;

    let mut records = Vec::with_capacity(evaluations.len());
    let mut failures = 0;
    for evaluation in evaluations {
        match evaluation.result {
            Ok(record) => records.push(record),
            Err(err) => {
                failures += 1;
                error!(
                    "{} vs {} at k={} failed: {}",
                    evaluation.pair.name_a, evaluation.pair.name_b, evaluation.k, err
                );
            }
        }
    }

    let tsv = matches.is_present("tsv");
    output_to(
        |writer| {
            if tsv {
                let rows: Vec<Vec<String>> = records.iter().map(|r| r.to_row()).collect();
                write_tsv(
                    writer,
                    &DissimilarityRecord::header(evaluator.sketch_sizes()),
                    &rows,
                )?;
            } else {
                serde_json::to_writer(writer, &records)
                    .map_err(|_| anyhow!("Could not serialize JSON to file"))?;
            }
            Ok(())
        },
        matches.value_of("output_file"),
        output_extension(matches),
    )?;

    if failures > 0 {
        bail!(
            "{} of {} evaluations failed",
            failures,
            failures + records.len()
        );
    }
    Ok(())
}

fn run_entropy(matches: &ArgMatches) -> Result<()> {
    let filenames: Vec<_> = matches
        .values_of("INPUT")
        .ok_or_else(|| anyhow!("Bad INPUT"))?
        .collect();

    let mut reports = Vec::with_capacity(filenames.len());
    for filename in filenames {
        let file = File::open(filename).context(format!("unable to open '{}'", filename))?;
        let histogram = read_dump(&mut BufReader::new(file), filename, None)?;
        let k = histogram.k;
        let data = sequence_entropy(histogram.into_iter().map(|(_, count)| count))
            .context(format!("bad histogram '{}'", filename))?;
        reports.push((filename, k, SequenceEntropy::new(&data, filename)?));
    }

    let tsv = matches.is_present("tsv");
    output_to(
        |writer| {
            if tsv {
                let mut header = vec!["name".to_string(), "k".to_string()];
                header.extend(SequenceEntropy::header(""));
                let rows: Vec<Vec<String>> = reports
                    .iter()
                    .map(|(name, k, entropy)| {
                        let mut row = vec![name.to_string(), k.to_string()];
                        entropy.extend_row(&mut row);
                        row
                    })
                    .collect();
                write_tsv(writer, &header, &rows)?;
            } else {
                let values: Vec<_> = reports
                    .iter()
                    .map(|(name, k, entropy)| json!({"name": name, "k": k, "entropy": entropy}))
                    .collect();
                serde_json::to_writer(writer, &values)
                    .map_err(|_| anyhow!("Could not serialize JSON to file"))?;
            }
            Ok(())
        },
        matches.value_of("output_file"),
        output_extension(matches),
    )
}

fn run() -> Result<()> {
    let matches = cli::build_cli().get_matches();

    match matches.subcommand() {
        ("dist", Some(matches)) => run_dist(matches)?,
        ("entropy", Some(matches)) => run_entropy(matches)?,
        other => bail!("Unknown subcommand: {:?}", other.0),
    };

    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env().init();
    if let Err(err) = run() {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}
