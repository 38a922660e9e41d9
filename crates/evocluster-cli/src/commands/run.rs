use crate::cli::RunArgs;
use crate::config::{DefaultsConfig, EnvironmentSpec, MoleculeSpec, PartialRunConfig, RunSetup};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use evocluster::core::collision::bonds::detect_bonds;
use evocluster::core::forcefield::backend::LennardJonesBackend;
use evocluster::core::forcefield::params::ForcefieldParams;
use evocluster::core::io::history::{HistoryError, HistoryWriter};
use evocluster::core::io::traits::MolecularFile;
use evocluster::core::io::xyz::{XyzFile, write_geometry};
use evocluster::core::models::cartesians::Cartesians;
use evocluster::core::models::environment::Environment;
use evocluster::core::models::geometry::Geometry;
use evocluster::core::models::molecule::MoleculeConfig;
use evocluster::engine::error::EngineError;
use evocluster::engine::operators::heat::LocalHeatOptimizer;
use evocluster::engine::operators::init::{DeferredInitializer, RandomInitializer};
use evocluster::engine::optimizer::LocalOptimizer;
use evocluster::engine::optimizer::fire::FireOptimizer;
use evocluster::engine::progress::ProgressReporter;
use evocluster::engine::validation::GeometryValidator;
use evocluster::workflows;
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub fn run(args: RunArgs) -> Result<()> {
    let partial = PartialRunConfig::from_file(&args.config)?;
    let base_dir = args
        .config
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    info!("Merging configuration from file and CLI arguments...");
    let setup = partial.merge_with_cli(&args, &base_dir, &DefaultsConfig::default())?;

    let template = build_template(&setup)?;
    info!(
        molecules = template.molecule_count(),
        atoms = template.total_atom_count(),
        "Cluster template assembled."
    );

    let params = ForcefieldParams::load(&setup.params_path).map_err(EngineError::from)?;
    let (all_atoms, _) = template.full_cartesians();
    params
        .ensure_covers(&all_atoms.elements)
        .map_err(EngineError::from)?;
    let optimizer = build_optimizer(&setup, params)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Searching {} molecule(s) with seed {}...",
        template.molecule_count(),
        setup.search.seed
    );
    let result = workflows::search::run(&template, &setup.search, optimizer, &reporter)?;

    if let Some((id, fitness)) = progress_handler.best() {
        debug!(id, fitness, "Last improvement reported during the search.");
    }
    let stats = result.statistics;
    info!(
        evaluations = stats.fitness_evaluations,
        accepted = stats.accepted,
        rejected = stats.rejected,
        failed = stats.failed,
        "Search statistics."
    );

    if result.entries.is_empty() {
        warn!("Search completed but the pool is empty.");
        println!("Warning: the search finished without any valid geometry.");
    }
    for (rank, entry) in result.entries.iter().take(setup.keep).enumerate() {
        let path = output_path(&args.output, rank, setup.keep);
        write_xyz(&path, &entry.geometry)?;
        println!(
            "{} geometry {} (fitness {:.6}) written to: {}",
            if rank == 0 { "Best" } else { "    " },
            entry.geometry.id,
            entry.fitness,
            path.display()
        );
    }

    if let Some(path) = &args.history {
        let write = || -> std::result::Result<(), HistoryError> {
            let mut writer = HistoryWriter::create(path)?;
            writer.append_all(&result.history)?;
            writer.finish()?;
            Ok(())
        };
        write().map_err(|e| CliError::FileWriting {
            path: path.clone(),
            source: e.into(),
        })?;
        info!(records = result.history.len(), "Genealogy written to {:?}", path);
    }

    Ok(())
}

fn read_xyz(path: &Path) -> Result<Cartesians> {
    XyzFile::read_from_path(path)
        .map(|(cartes, _)| cartes)
        .map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
}

fn build_template(setup: &RunSetup) -> Result<Geometry> {
    let blow = setup.search.blow;
    let mut molecules = Vec::new();
    for spec in &setup.molecules {
        let molecule = load_molecule(spec)?;
        molecules.extend(std::iter::repeat_n(molecule, spec.count));
    }
    let environment = setup
        .environment
        .as_ref()
        .map(|spec| load_environment(spec, blow.bonds, blow.environment))
        .transpose()?;
    Geometry::with_perceived_bonds(0, molecules, environment, blow.bonds)
        .map_err(|e| EngineError::from(e).into())
}

fn load_molecule(spec: &MoleculeSpec) -> Result<MoleculeConfig> {
    let cartes = read_xyz(&spec.path)?;
    let mut molecule = MoleculeConfig::from_coordinates(
        spec.name.as_str(),
        cartes.elements.clone(),
        &cartes.positions,
    )
    .map_err(EngineError::from)?;
    molecule.flexible = spec.flexible;
    molecule.constricted = spec.constricted;
    if spec.constricted {
        molecule.position = cartes.center_of_mass().unwrap_or_else(Point3::origin);
    }
    Ok(molecule)
}

fn load_environment(spec: &EnvironmentSpec, bond_blow: f64, fit_blow: f64) -> Result<Environment> {
    let atoms = read_xyz(&spec.path)?;
    let bonds = detect_bonds(&atoms, bond_blow);
    let reference = spec
        .reference
        .or_else(|| atoms.center_of_mass())
        .unwrap_or_else(Point3::origin);
    let mut environment = Environment::new(
        atoms,
        bonds,
        reference,
        spec.space.clone(),
        spec.mode,
        fit_blow,
    )
    .map_err(EngineError::from)?;
    environment.flexible = spec.flexible;
    Ok(environment)
}

fn build_optimizer(setup: &RunSetup, params: ForcefieldParams) -> Result<Arc<dyn LocalOptimizer>> {
    let fire: Arc<dyn LocalOptimizer> =
        Arc::new(FireOptimizer::new(LennardJonesBackend::new(params), setup.fire));
    if !setup.heat_pulses {
        return Ok(fire);
    }

    let search = &setup.search;
    let validator = GeometryValidator::from_config(search);
    let reinit = Arc::new(DeferredInitializer::new());
    reinit
        .bind(Arc::new(RandomInitializer::new(
            search.space.clone(),
            validator.clone(),
            search.emergency_cap,
        )))
        .map_err(EngineError::from)?;
    info!("Local optimization wrapped in heat pulses.");
    Ok(Arc::new(LocalHeatOptimizer::new(
        fire,
        search.operators.heat.clone(),
        validator,
        reinit,
        search.acceptable_fitness,
        search.seed,
    )))
}

fn write_xyz(path: &Path, geometry: &Geometry) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_geometry(&mut writer, geometry).map_err(|e| CliError::FileWriting {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    writer.flush()?;
    Ok(())
}

/// `best.xyz` for the winner; `best-2.xyz`, `best-3.xyz`... for the runners-up.
fn output_path(base: &Path, rank: usize, total: usize) -> PathBuf {
    if total <= 1 || rank == 0 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map_or_else(|| "geometry".into(), |s| s.to_string_lossy());
    let name = match base.extension() {
        Some(ext) => format!("{stem}-{}.{}", rank + 1, ext.to_string_lossy()),
        None => format!("{stem}-{}", rank + 1),
    };
    base.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use evocluster::core::io::history::read_history;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn output_path_numbers_runners_up() {
        let base = Path::new("/tmp/out/best.xyz");
        assert_eq!(output_path(base, 0, 3), PathBuf::from("/tmp/out/best.xyz"));
        assert_eq!(output_path(base, 2, 3), PathBuf::from("/tmp/out/best-3.xyz"));
        assert_eq!(
            output_path(Path::new("cluster"), 1, 2),
            PathBuf::from("cluster-2")
        );
    }

    #[test]
    fn argon_search_writes_geometries_and_history() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("argon.xyz"), "1\nargon\nAr 0.0 0.0 0.0\n").unwrap();
        fs::write(
            root.join("lj.toml"),
            "[lj]\nAr = { radius = 3.82, well_depth = 0.996 }\n",
        )
        .unwrap();
        fs::write(
            root.join("search.toml"),
            r#"
[forcefield]
params = "lj.toml"

[[cluster.molecules]]
file = "argon.xyz"
count = 4

[search]
seed = 3
global-iterations = 6
batch-size = 3

[space]
type = "sphere"
radius = 4.0

[pool]
size = 5
duplicate-tolerance = 0.0
"#,
        )
        .unwrap();

        let config = root.join("search.toml");
        let output = root.join("best.xyz");
        let history = root.join("history.csv");
        let cli = Cli::parse_from([
            "evocluster",
            "run",
            "-c",
            config.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--history",
            history.to_str().unwrap(),
            "--keep",
            "2",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        run(args).unwrap();

        let (best, meta) = XyzFile::read_from_path(&output).unwrap();
        assert_eq!(best.atom_count(), 4);
        assert!(meta.comment.contains("fitness"));
        assert!(root.join("best-2.xyz").exists());
        let records = read_history(&history).unwrap();
        assert!(records.len() >= 5);
        assert!(records.iter().any(|r| r.accepted));
    }
}
