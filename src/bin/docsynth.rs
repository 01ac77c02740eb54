use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use docsynth::{
    BackendKind, CancelToken, EnforcerPolicy, ManifestMode, Pipeline, PipelineConfig,
    ProviderConfig, SpecSet, SynthError, create_backend, derive_sample_seed, load_manifest,
    verify_manifest,
};

#[derive(Parser, Debug)]
#[command(name = "docsynth", version, about = "Synthesize labeled document images")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a spec directory and print its content hashes.
    Validate(SpecArgs),
    /// Print the resolved layout of one sample as JSON.
    Layout(LayoutArgs),
    /// Generate a batch of samples.
    Generate(GenerateArgs),
    /// Regenerate every sample of a manifest and compare fingerprints.
    Verify(VerifyArgs),
}

#[derive(Parser, Debug)]
struct SpecArgs {
    /// Directory holding structure.yaml, ruleset.yaml and groundtruth.yaml.
    #[arg(long, default_value = ".")]
    specs: PathBuf,
}

#[derive(Parser, Debug)]
struct LayoutArgs {
    #[command(flatten)]
    spec: SpecArgs,

    /// Global seed.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Sample index within the batch.
    #[arg(long, default_value_t = 0)]
    index: u64,

    /// Provider configuration (YAML). Defaults to the deterministic fallback generator.
    #[arg(long)]
    provider: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    spec: SpecArgs,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    /// Number of samples.
    #[arg(long, default_value_t = 1)]
    samples: u64,

    /// Global seed.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Worker threads (default: one per core).
    #[arg(long)]
    workers: Option<usize>,

    /// Skip samples already recorded, unchanged, in the output manifest.
    #[arg(long, conflicts_with = "overwrite")]
    resume: bool,

    /// Discard a dataset already recorded in the output directory.
    #[arg(long)]
    overwrite: bool,

    /// Render backend: raster or layout-only.
    #[arg(long, default_value = "raster")]
    backend: BackendKind,

    /// Provider configuration (YAML). Defaults to the deterministic fallback generator.
    #[arg(long)]
    provider: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct VerifyArgs {
    #[command(flatten)]
    spec: SpecArgs,

    /// Dataset directory containing manifest.json.
    #[arg(long)]
    out: PathBuf,

    /// Render backend (default: the one recorded in the manifest).
    #[arg(long)]
    backend: Option<BackendKind>,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docsynth=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate(args) => cmd_validate(&args),
        Command::Layout(args) => cmd_layout(&args),
        Command::Generate(args) => cmd_generate(args),
        Command::Verify(args) => cmd_verify(&args),
    }
}

fn load_specs(args: &SpecArgs) -> anyhow::Result<SpecSet> {
    match SpecSet::load_dir(&args.specs) {
        Ok(specs) => Ok(specs),
        Err(SynthError::SpecValidation(errors)) => {
            for e in &errors.errors {
                eprintln!("{e}");
            }
            anyhow::bail!("{} spec error(s) in '{}'", errors.len(), args.specs.display())
        }
        Err(e) => Err(e.into()),
    }
}

fn load_provider(path: Option<&Path>) -> anyhow::Result<ProviderConfig> {
    let Some(path) = path else {
        return Ok(ProviderConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read provider config '{}'", path.display()))?;
    Ok(ProviderConfig::from_yaml_str(&text)?)
}

fn cmd_validate(args: &SpecArgs) -> anyhow::Result<ExitCode> {
    let specs = load_specs(args)?;
    let h = specs.hashes();
    println!("structure   {}", h.structure);
    println!("groundtruth {}", h.groundtruth);
    println!("ruleset     {}", h.ruleset);
    Ok(ExitCode::SUCCESS)
}

fn cmd_layout(args: &LayoutArgs) -> anyhow::Result<ExitCode> {
    let specs = load_specs(&args.spec)?;
    let provider = load_provider(args.provider.as_deref())?;
    let config = PipelineConfig {
        policy: EnforcerPolicy {
            repair_attempts: provider.repair_attempts,
        },
        backend: BackendKind::LayoutOnly,
        ..PipelineConfig::new(".")
    };
    let pipeline = Pipeline::new(specs, config, &provider)?;
    let blocks = pipeline.layout(derive_sample_seed(args.seed, args.index), None)?;
    let json = serde_json::to_string_pretty(&blocks).context("serialize layout")?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<ExitCode> {
    let specs = load_specs(&args.spec)?;
    let provider = load_provider(args.provider.as_deref())?;
    let config = PipelineConfig {
        output_dir: args.out,
        samples: args.samples,
        global_seed: args.seed,
        workers: args.workers,
        mode: match (args.resume, args.overwrite) {
            (true, _) => ManifestMode::Resume,
            (false, true) => ManifestMode::Overwrite,
            (false, false) => ManifestMode::Create,
        },
        policy: EnforcerPolicy {
            repair_attempts: provider.repair_attempts,
        },
        backend: args.backend,
    };
    let pipeline = Pipeline::new(specs, config, &provider)?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    ctrlc::set_handler(move || {
        if on_interrupt.is_cancelled() {
            std::process::exit(130);
        }
        eprintln!("interrupted; finishing in-flight samples (interrupt again to abort)");
        on_interrupt.cancel();
    })
    .context("install interrupt handler")?;

    let report = pipeline.run_batch(&cancel)?;
    println!("{report}");
    eprintln!("wrote {}", report.manifest.display());
    Ok(if !report.is_success() {
        ExitCode::from(2)
    } else if report.cancelled > 0 {
        ExitCode::from(130)
    } else {
        ExitCode::SUCCESS
    })
}

fn cmd_verify(args: &VerifyArgs) -> anyhow::Result<ExitCode> {
    let specs = load_specs(&args.spec)?;
    let manifest_path = PipelineConfig::new(&args.out).manifest_path();
    let manifest = load_manifest(&manifest_path)?;
    let kind = match args.backend {
        Some(kind) => kind,
        None => manifest
            .batch
            .renderer
            .name
            .parse::<BackendKind>()
            .map_err(anyhow::Error::msg)?,
    };
    let backend = create_backend(kind)?;
    let scratch = args.out.join(".verify");
    let report = verify_manifest(&specs, &manifest, backend.as_ref(), &scratch);
    let _ = std::fs::remove_dir_all(&scratch);
    let report = report?;

    for m in &report.mismatches {
        println!("{m}");
    }
    println!(
        "{} samples checked, {} mismatches",
        report.checked,
        report.mismatches.len()
    );
    Ok(if report.is_reproducible() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
