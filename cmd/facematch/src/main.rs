//! facematch CLI - run face-identity matching over JSON face snapshots.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use photark_faces::{FaceCollection, FaceRecord, IdentityId};
use photark_recognize::{
    MatchConfig, MatchReconciler, TargetFaceIndex, UnknownIdAlloc, dump_assignments,
};

/// Matches detected faces in a snapshot against labeled reference faces
/// and writes the updated snapshot.
///
/// Incremental mode (default) matches the snapshot against its own
/// manually-labeled faces and leaves curated records untouched. With
/// --previous the run is a full reconciliation: curated labels from the
/// previous snapshot are carried onto the re-detected regions by
/// geometric overlap before matching, and per-photo curated counts are
/// audited afterwards.
#[derive(Parser)]
#[command(name = "facematch")]
#[command(about = "Face-identity matching over JSON face snapshots")]
#[command(version)]
struct Cli {
    /// Snapshot to process (JSON array of face records)
    #[arg(short = 'f', long)]
    input: PathBuf,

    /// Previous run's snapshot; switches to full-run reconciliation
    #[arg(long)]
    previous: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Identity display names (JSON object of id -> name)
    #[arg(long)]
    names: Option<PathBuf>,

    /// Match acceptance threshold
    #[arg(long)]
    threshold: Option<f32>,

    /// Admit reference faces that failed the detector quality flag
    #[arg(long)]
    include_non_ok: bool,

    /// Emit only changed faces and manually-labeled faces
    #[arg(long)]
    dirty_only: bool,

    /// Log every assignment and flag duplicate identities per photo
    #[arg(long)]
    dump: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let mut cfg = MatchConfig::default();
    if let Some(t) = cli.threshold {
        cfg.threshold = t;
    }
    cfg.include_non_ok = cli.include_non_ok;
    let cfg = cfg.sanitized();

    let names = match &cli.names {
        Some(path) => load_names(path)?,
        None => HashMap::new(),
    };

    let mut faces = load_faces(&cli.input)?;
    let mut alloc = UnknownIdAlloc::new();

    let dirty = match &cli.previous {
        Some(path) => {
            let mut previous = load_faces(path)?;
            let index = TargetFaceIndex::build(&previous, &cfg, &mut alloc)?;
            let reconciler = MatchReconciler::new(cfg, index, &names);
            reconciler.run_full(&mut previous, &mut faces)?
        }
        None => {
            let index = TargetFaceIndex::build(&faces, &cfg, &mut alloc)?;
            let reconciler = MatchReconciler::new(cfg, index, &names);
            reconciler.run(&mut faces)?
        }
    };
    tracing::info!(changed = dirty.len(), faces = faces.len(), "run complete");

    if cli.dump {
        dump_assignments(&faces);
    }

    let out: Vec<&FaceRecord> = faces
        .iter()
        .filter(|f| !cli.dirty_only || f.dirty || f.source.is_manual_defined())
        .collect();
    let json = serde_json::to_string_pretty(&out)?;
    match &cli.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("write {}", path.display()))?
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn load_faces(path: &Path) -> anyhow::Result<FaceCollection> {
    let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let faces: Vec<FaceRecord> =
        serde_json::from_slice(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(FaceCollection::from_faces(faces))
}

fn load_names(path: &Path) -> anyhow::Result<HashMap<IdentityId, String>> {
    let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let raw: HashMap<String, String> =
        serde_json::from_slice(&data).with_context(|| format!("parse {}", path.display()))?;
    let mut names = HashMap::new();
    for (k, v) in raw {
        let id: IdentityId = k.parse().with_context(|| format!("identity id {k:?}"))?;
        names.insert(id, v);
    }
    Ok(names)
}
