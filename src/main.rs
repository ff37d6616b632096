use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::ops::ControlFlow;

use anyhow::{bail, Context, Result};
use clap::{value_t_or_exit, values_t_or_exit, App, AppSettings, Arg, ArgMatches};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use nbgibbs::bag::{compact_words, load_bags, load_labels};
use nbgibbs::dataset::Experiment;
use nbgibbs::logging::init_tracing;
use nbgibbs::{Model, Sampler, SamplerConfig};

fn make_rng(config: &SamplerConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn load_config(matches: &ArgMatches) -> Result<SamplerConfig> {
    let mut config = match matches.value_of("config") {
        Some(fp) => SamplerConfig::from_json_file(fp).with_context(|| format!("reading config {}", fp))?,
        None => SamplerConfig::default(),
    };
    if matches.is_present("iterations") {
        config.iterations = value_t_or_exit!(matches, "iterations", usize);
    }
    if matches.is_present("seed") {
        config.seed = Some(value_t_or_exit!(matches, "seed", u64));
    }
    if matches.is_present("gamma-pi") {
        let values = values_t_or_exit!(matches, "gamma-pi", f64);
        match values[..] {
            [a, b] => config.gamma_pi = [a, b],
            _ => bail!("--gamma-pi takes exactly two values"),
        }
    }
    if matches.is_present("gamma-theta") {
        config.gamma_theta = value_t_or_exit!(matches, "gamma-theta", f64);
    }
    Ok(config)
}

fn run_test_dataset(matches: &ArgMatches, config: &SamplerConfig) -> Result<()> {
    let experiment = Experiment {
        num_docs: value_t_or_exit!(matches, "docs", usize),
        vocab_size: value_t_or_exit!(matches, "vocab", usize),
        mean_length: value_t_or_exit!(matches, "mean-length", f64),
        observed_fraction: value_t_or_exit!(matches, "observed-fraction", f64),
    };
    let trials = value_t_or_exit!(matches, "trials", usize);
    let mut rng = make_rng(config);
    let mut total = 0.0;
    for t in 0..trials {
        write!(&mut io::stderr(), "\rTrial {}/{}...", t + 1, trials)?;
        let acc = experiment.run(config, &mut rng).with_context(|| format!("trial {}", t + 1))?;
        writeln!(&mut io::stderr(), " done.")?;
        println!("trial {} accuracy = {:.4}", t + 1, acc);
        total += acc;
    }
    if trials > 0 {
        println!("mean accuracy = {:.4}", total / trials as f64);
    }
    Ok(())
}

fn run_corpus(matches: &ArgMatches, config: &SamplerConfig, input_fp: &str) -> Result<()> {
    let labels_fp = matches.value_of("LABELS").context("a LABELS file is required with INPUT")?;
    let (dataset, vocab_size) = load_bags(input_fp).with_context(|| format!("reading corpus {}", input_fp))?;
    let observed = load_labels(labels_fp).with_context(|| format!("reading labels {}", labels_fp))?;
    let (dataset, vocab_size) = if matches.is_present("compact") {
        write!(&mut io::stderr(), "Compacting the dataset...")?;
        let (dataset, compact_size, _) = compact_words(dataset);
        writeln!(&mut io::stderr(), " done.")?;
        (dataset, compact_size)
    } else {
        (dataset, vocab_size)
    };
    info!(documents = dataset.len(), observed = observed.len(), vocab_size, "corpus loaded");

    let hyper = config.hyperparameters(vocab_size)?;
    let sampler = Sampler::new(&dataset, &observed, &hyper);
    let mut rng = make_rng(config);
    let iterations = config.iterations;
    let mut sweeps = 0;
    write!(&mut io::stderr(), "Sampling...")?;
    let state = sampler.run_with(iterations, &mut rng, |s, _| {
        sweeps = s + 1;
        let _ = write!(&mut io::stderr(), "\rSampling... {}/{}", s + 1, iterations);
        ControlFlow::Continue(())
    })?;
    writeln!(&mut io::stderr(), "\rSampled.")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for (j, label) in sampler.free().zip(sampler.inferred(&state)) {
        writeln!(out, "{}\t{}", j, label)?;
    }
    out.flush()?;

    if let Some(fp) = matches.value_of("model") {
        let model = Model::new(state, &hyper, observed.len(), sweeps);
        let file = File::create(fp).with_context(|| format!("creating {}", fp))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &model)?;
        writer.flush()?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let matches = App::new("nbgibbs")
        .version("0.1")
        .author("Yuta Taniguchi <yuta.taniguchi.y.t@gmail.com>")
        .about("Semi-supervised Naive Bayes by collapsed Gibbs sampling")
        .arg(Arg::with_name("config")
             .long("config")
             .takes_value(true)
             .value_name("CONFIG-FILE")
             .help("Read sampler settings from a JSON file"))
        .arg(Arg::with_name("iterations")
             .long("iterations")
             .takes_value(true)
             .value_name("NUMBER")
             .help("Set the number of sweeps [default: 100]"))
        .arg(Arg::with_name("seed")
             .long("seed")
             .takes_value(true)
             .value_name("NUMBER")
             .help("Seed the random number generator"))
        .arg(Arg::with_name("gamma-pi")
             .long("gamma-pi")
             .takes_value(true)
             .number_of_values(2)
             .use_delimiter(true)
             .value_name("A,B")
             .help("Set the class pseudo-counts [default: 1,1]"))
        .arg(Arg::with_name("gamma-theta")
             .long("gamma-theta")
             .takes_value(true)
             .value_name("NUMBER")
             .help("Set the word pseudo-count [default: 1]"))
        .arg(Arg::with_name("test-dataset")
             .long("test-dataset")
             .help("Run with automatically generated datasets"))
        .arg(Arg::with_name("trials")
             .long("trials")
             .takes_value(true)
             .value_name("NUMBER")
             .default_value("1")
             .help("Set the number of generated datasets"))
        .arg(Arg::with_name("docs")
             .long("docs")
             .takes_value(true)
             .value_name("NUMBER")
             .default_value("400")
             .help("Set the number of generated documents"))
        .arg(Arg::with_name("vocab")
             .long("vocab")
             .takes_value(true)
             .value_name("NUMBER")
             .default_value("10000")
             .help("Set the generated vocabulary size"))
        .arg(Arg::with_name("mean-length")
             .long("mean-length")
             .takes_value(true)
             .value_name("NUMBER")
             .default_value("25")
             .help("Set the mean generated document length"))
        .arg(Arg::with_name("observed-fraction")
             .long("observed-fraction")
             .takes_value(true)
             .value_name("FRACTION")
             .default_value("0.8")
             .help("Set the fraction of generated labels given to the sampler"))
        .arg(Arg::with_name("compact")
             .long("compact")
             .help("Renumber the words of INPUT densely before sampling"))
        .arg(Arg::with_name("model")
             .long("model")
             .value_name("MODEL-FILE")
             .help("Write the final model as JSON")
             .takes_value(true))
        .arg(Arg::with_name("INPUT")
             .help("Sets the corpus file to use")
             .required(false)
             .index(1)
             .requires("LABELS"))
        .arg(Arg::with_name("LABELS")
             .help("Sets the file of labels for the leading documents")
             .required(false)
             .index(2))
        .setting(AppSettings::ArgRequiredElseHelp)
        .get_matches();

    init_tracing();
    let config = load_config(&matches)?;

    if matches.is_present("test-dataset") {
        run_test_dataset(&matches, &config)
    } else if let Some(input_fp) = matches.value_of("INPUT") {
        run_corpus(&matches, &config, input_fp)
    } else {
        bail!("either --test-dataset or INPUT and LABELS must be given")
    }
}
