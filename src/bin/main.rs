mod opt;

use std::fmt::Display;

use crate::opt::{Opt, Source};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use itertools::Itertools;
use jetorigin::{
    associate::Acceptance,
    cluster::JetDefinition,
    config::RunConfig,
    hepmc2::HepMCReader,
    pipeline::{Pipeline, RunState},
    record::{output_filename, TrainingWriter},
    species,
    toy::ToyGenerator,
    traits::Generate,
    GIT_BRANCH, GIT_REV, VERSION,
};
use log::{debug, info};
use particle_id::ParticleID;
use rand::Rng;

fn main() -> Result<()> {
    let args = argfile::expand_args_from(
        std::env::args_os(),
        argfile::parse_fromfile,
        argfile::PREFIX,
    )
    .with_context(|| "Failed to read argument file")?;
    let opt = Opt::parse_from(args);

    let env = Env::default().filter_or("JETORIGIN_LOG", &opt.loglevel);
    env_logger::init_from_env(env);

    if let (Some(rev), Some(branch)) = (GIT_REV, GIT_BRANCH) {
        info!("jetorigin {VERSION} rev {rev} ({branch})");
    } else {
        info!("jetorigin {VERSION}");
    }
    debug!("settings: {:#?}", opt);

    let config = RunConfig::from_file(&opt.config).with_context(|| {
        format!("Failed to read run settings from {:?}", opt.config)
    })?;
    debug!("run settings: {config:?}");

    std::fs::create_dir_all(&opt.outdir).with_context(|| {
        format!("Failed to create output directory {:?}", opt.outdir)
    })?;
    let outfile = opt
        .outdir
        .join(output_filename(config.thread, opt.compression));
    let writer = TrainingWriter::create(&outfile, opt.compression)
        .with_context(|| format!("Failed to open {outfile:?}"))?;
    info!("Writing training records to {outfile:?}");

    let state = match &opt.source {
        Source::Toy => {
            let seed = opt.seed.unwrap_or_else(|| rand::thread_rng().gen());
            info!("Toy generator seed: {seed}");
            let generator = ToyGenerator::from_seed(seed)
                .min_pt(opt.toy_min_pt)
                .failure_probability(opt.failure_probability);
            run(generator, writer, &opt, &config)
        }
        Source::File(path) => {
            let generator = HepMCReader::open(path)
                .with_context(|| format!("Failed to open {path:?}"))?;
            run(generator, writer, &opt, &config)
        }
    }?;

    report(&state, &config);
    info!("done");
    Ok(())
}

fn run<G>(
    generator: G,
    writer: TrainingWriter,
    opt: &Opt,
    config: &RunConfig,
) -> Result<RunState>
where
    G: Generate,
    G::Error: Display,
{
    let jet_def: JetDefinition = opt.jet_def.into();
    let pipeline = Pipeline::builder()
        .generator(generator)
        .clustering(jet_def)
        .writer(writer)
        .acceptance(Acceptance::new(config.jet_pt_cutoff))
        .parton_index(opt.parton_index as usize)
        .verbose(config.verbose)
        .histogram(opt.outdir.join(&opt.histogram))
        .build();
    let state = pipeline.run(config.n_events)?;
    Ok(state)
}

fn report(state: &RunState, config: &RunConfig) {
    let stats = state.stats();
    info!(
        "Processed {} events: {} records written, {} without jets, {} below jet pt cutoff, {} unresolved, {} without reference parton, {} failed",
        stats.total(),
        stats.emitted,
        stats.no_jets,
        stats.below_cutoff,
        stats.unresolved,
        stats.missing_parton,
        stats.generation_failed
    );
    if config.verbose {
        println!("Heavy Flavor: {}", stats.heavy_flavour);
    }
    let ids = state
        .observed_ids()
        .iter()
        .map(|&code| format!("{}({code})", species::name(ParticleID::new(code))))
        .join(" ");
    println!("{ids}");
}
