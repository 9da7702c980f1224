use anyhow::Result;
use candle_core::{Device, Tensor};
use clap::Parser;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rmp_core::env::Env;
use rmp_residual::{
    config::ResidualEnvConfig,
    residual_env::ResidualEnv,
    test_utils::{GoalAttractorBuilder, PointMassEnv},
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs the goal attractor with a random residual on top of it for a few episodes.
#[derive(Parser, Debug)]
struct Args {
    /// Yaml file with configuration overrides
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 3)]
    episodes: usize,
    /// Largest magnitude of the random residual
    #[arg(long, default_value_t = 0.1)]
    residual_scale: f32,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ResidualEnvConfig::from_yaml_file(path)?,
        None => ResidualEnvConfig::default(),
    };
    let device = Device::Cpu;
    let mut env = ResidualEnv::from_config(
        config,
        &PointMassEnv::build,
        &GoalAttractorBuilder,
        &device,
    )?;
    let description = env.env_description();
    let action_size = description.action_size();
    info!(
        action_size,
        observation_size = description.observation_size(),
        episodes = args.episodes,
        "environment ready"
    );
    let mut rng = StdRng::seed_from_u64(args.seed);
    for episode in 0..args.episodes {
        env.reset(args.seed + episode as u64)?;
        let mut total_reward = 0.;
        let mut steps = 0;
        loop {
            let residual: Vec<f32> = (0..action_size)
                .map(|_| rng.random_range(-args.residual_scale..=args.residual_scale))
                .collect();
            let residual = Tensor::from_vec(residual, action_size, &device)?;
            let snapshot = env.step(residual)?;
            total_reward += snapshot.reward;
            steps += 1;
            if snapshot.done() {
                info!(
                    episode,
                    steps,
                    total_reward,
                    reached = snapshot.terminated,
                    "episode finished"
                );
                break;
            }
        }
    }
    Ok(())
}
