//! rtrees Command Line Interface
//!
//! Train density estimation trees and run max-kernel searches on CSV point
//! sets (one point per row).

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info, warn};
use rtrees::core::{Result, TreeError};
use rtrees::data::{load_labels, load_matrix, save_columns};
use rtrees::det::{print_leaf_membership, print_variable_importance};
use rtrees::{
    DensityTree, FastMksModel, KernelFunction, KernelParams, ModelFile, PathCacher, PathFormat,
    PersistentModel, Trainer, TrainerConfig,
};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "rtrees")]
#[command(about = "Density estimation trees and fast max-kernel search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "rtrees contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train or apply a density estimation tree
    Det(DetArgs),
    /// Build or apply a max-kernel search model
    Fastmks(FastMksArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(Args)]
struct DetArgs {
    /// Training data (CSV, one point per row)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Previously trained tree
    #[arg(long)]
    input_model: Option<PathBuf>,

    /// Number of cross-validation folds
    #[arg(short, long, default_value = "10")]
    folds: usize,

    /// Maximum number of points in a leaf
    #[arg(long, default_value = "10")]
    max_leaf_size: usize,

    /// Minimum number of points in a leaf
    #[arg(long, default_value = "5")]
    min_leaf_size: usize,

    /// Use volume regularization when pruning
    #[arg(long)]
    volume_regularization: bool,

    /// Return the unpruned tree without cross-validation
    #[arg(long)]
    skip_pruning: bool,

    /// Write training point densities under the unpruned tree
    #[arg(long)]
    unpruned_output: Option<PathBuf>,

    /// Write training point densities under the final tree
    #[arg(long)]
    training_estimates: Option<PathBuf>,

    /// Test data to estimate densities for
    #[arg(long)]
    test: Option<PathBuf>,

    /// Write test point densities
    #[arg(long)]
    test_estimates: Option<PathBuf>,

    /// Class labels of the training points, for the leaf membership report
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Number of classes (defaults to the largest label plus one)
    #[arg(long)]
    num_classes: Option<usize>,

    /// Write the leaf membership report here instead of stdout
    #[arg(long)]
    membership_output: Option<PathBuf>,

    /// Print per-dimension variable importance
    #[arg(long)]
    variable_importance: bool,

    /// Write variable importance here instead of stdout
    #[arg(long)]
    vi_output: Option<PathBuf>,

    /// Write the root-to-leaf path of every leaf
    #[arg(long)]
    paths_output: Option<PathBuf>,

    /// Format of the leaf paths
    #[arg(long, value_enum, default_value = "lr")]
    path_format: CliPathFormat,

    /// Save the trained tree
    #[arg(short, long)]
    output_model: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliPathFormat {
    /// Left/right decisions only
    #[value(name = "lr")]
    Lr,
    /// Decision followed by the parent's tag
    #[value(name = "lr-id")]
    LrId,
    /// Parent's tag followed by the decision
    #[value(name = "id-lr")]
    IdLr,
}

impl From<CliPathFormat> for PathFormat {
    fn from(cli_format: CliPathFormat) -> Self {
        match cli_format {
            CliPathFormat::Lr => PathFormat::Lr,
            CliPathFormat::LrId => PathFormat::LrId,
            CliPathFormat::IdLr => PathFormat::IdLr,
        }
    }
}

#[derive(Args)]
struct FastMksArgs {
    /// Reference data (CSV, one point per row)
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Previously built model
    #[arg(long)]
    input_model: Option<PathBuf>,

    /// Query data; without it the reference set is searched against itself
    #[arg(short, long)]
    query: Option<PathBuf>,

    /// Number of maximum kernels to find
    #[arg(short, long)]
    k: Option<usize>,

    /// Kernel: linear, polynomial, cosine, gaussian, epanechnikov, triangular, hyptan
    #[arg(long)]
    kernel: Option<String>,

    /// Degree of the polynomial kernel
    #[arg(long)]
    degree: Option<f64>,

    /// Offset of the polynomial and hyptan kernels
    #[arg(long)]
    offset: Option<f64>,

    /// Bandwidth of the gaussian, epanechnikov and triangular kernels
    #[arg(long)]
    bandwidth: Option<f64>,

    /// Scale of the hyptan kernel
    #[arg(long)]
    scale: Option<f64>,

    /// Brute-force search
    #[arg(long)]
    naive: bool,

    /// Single-tree search instead of dual-tree
    #[arg(long)]
    single: bool,

    /// Cover tree base
    #[arg(short, long, default_value = "2.0")]
    base: f64,

    /// Write result indices (one query per line)
    #[arg(long)]
    indices: Option<PathBuf>,

    /// Write result kernel values (one query per line)
    #[arg(long)]
    kernels: Option<PathBuf>,

    /// Save the model
    #[arg(short, long)]
    output_model: Option<PathBuf>,
}

impl FastMksArgs {
    fn kernel_params(&self) -> KernelParams {
        let defaults = KernelParams::default();
        KernelParams {
            degree: self.degree.unwrap_or(defaults.degree),
            offset: self.offset.unwrap_or(defaults.offset),
            bandwidth: self.bandwidth.unwrap_or(defaults.bandwidth),
            scale: self.scale.unwrap_or(defaults.scale),
        }
    }

    fn has_kernel_options(&self) -> bool {
        self.kernel.is_some()
            || self.degree.is_some()
            || self.offset.is_some()
            || self.bandwidth.is_some()
            || self.scale.is_some()
    }
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Det(args) => det_command(args),
        Commands::Fastmks(args) => fastmks_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn input_error(a_name: &str, b_name: &str) -> TreeError {
    TreeError::ConflictingInputs(format!("Exactly one of --{a_name} and --{b_name} must be given"))
}

fn require_one_of(a: &Option<PathBuf>, a_name: &str, b: &Option<PathBuf>, b_name: &str) -> Result<()> {
    if a.is_some() == b.is_some() {
        return Err(input_error(a_name, b_name));
    }
    Ok(())
}

fn det_command(args: DetArgs) -> Result<()> {
    require_one_of(&args.data, "data", &args.input_model, "input-model")?;

    let training: Option<Array2<f64>> = match &args.data {
        Some(path) => {
            info!("Loading training data from: {path:?}");
            Some(load_matrix(path)?)
        }
        None => None,
    };

    let mut tree = match (&training, &args.input_model) {
        (Some(data), None) => {
            let config = TrainerConfig {
                folds: args.folds,
                use_volume_reg: args.volume_regularization,
                max_leaf_size: args.max_leaf_size,
                min_leaf_size: args.min_leaf_size,
                unpruned_tree_output: args.unpruned_output.clone(),
                skip_pruning: args.skip_pruning,
            };
            Trainer::from_config(config).train(data.view())?
        }
        (None, Some(path)) => {
            info!("Loading model from: {path:?}");
            ModelFile::<DensityTree>::load_from_file(path)?.into_model()
        }
        _ => return Err(input_error("data", "input-model")),
    };
    info!("Density tree has {} leaves", tree.num_leaves());

    if let Some(data) = &training {
        if let Some(path) = &args.training_estimates {
            write_values(path, &tree.compute_values(data.view())?)?;
            info!("Training estimates saved to: {path:?}");
        }

        if let Some(labels_path) = &args.labels {
            let labels = load_labels(labels_path)?;
            let num_classes = args
                .num_classes
                .unwrap_or_else(|| labels.iter().max().map_or(0, |&m| m + 1));
            print_leaf_membership(
                &mut tree,
                data.view(),
                &labels,
                num_classes,
                args.membership_output.as_deref(),
            )?;
        }
    } else {
        if args.training_estimates.is_some() || args.labels.is_some() {
            warn!("Training estimates and leaf membership need --data; skipping");
        }
        if args.unpruned_output.is_some() {
            warn!("--unpruned-output is ignored when loading a model");
        }
    }

    if let Some(test_path) = &args.test {
        let test = load_matrix(test_path)?;
        let estimates = tree.compute_values(test.view())?;
        match &args.test_estimates {
            Some(path) => {
                write_values(path, &estimates)?;
                info!("Test estimates saved to: {path:?}");
            }
            None => {
                let inside: Vec<f64> = estimates.iter().copied().filter(|&v| v > 0.0).collect();
                let mean_log = inside.iter().map(|v| v.ln()).sum::<f64>() / inside.len().max(1) as f64;
                println!("Test points inside the tree: {}/{}", inside.len(), estimates.len());
                println!("Mean log-density: {mean_log:.6}");
            }
        }
    }

    if args.variable_importance || args.vi_output.is_some() {
        print_variable_importance(&tree, args.vi_output.as_deref())?;
    }

    if let Some(path) = &args.paths_output {
        write_paths(&mut tree, args.path_format.into(), path)?;
        info!("Leaf paths saved to: {path:?}");
    }

    if let Some(path) = &args.output_model {
        ModelFile::new(tree).save_to_file(path)?;
        info!("Model saved to: {path:?}");
    }

    Ok(())
}

fn fastmks_command(args: FastMksArgs) -> Result<()> {
    require_one_of(&args.reference, "reference", &args.input_model, "input-model")?;

    let model = match (&args.reference, &args.input_model) {
        (Some(path), None) => {
            // Validate the kernel before reading any data
            let name = args.kernel.as_deref().ok_or_else(|| {
                TreeError::InvalidParameter("--kernel is required with --reference".to_string())
            })?;
            let kernel = KernelFunction::from_name(name, &args.kernel_params())?;

            info!("Loading reference data from: {path:?}");
            let reference = load_matrix(path)?;
            FastMksModel::build(reference, kernel, args.single, args.naive, args.base)?
        }
        (None, Some(path)) => {
            if args.has_kernel_options() {
                warn!("Kernel options are ignored when loading a model");
            }
            info!("Loading model from: {path:?}");
            let mut model = ModelFile::<FastMksModel>::load_from_file(path)?.into_model();
            model.set_search_mode(args.naive, args.single)?;
            model
        }
        _ => return Err(input_error("reference", "input-model")),
    };

    match args.k {
        Some(k) => {
            let queries = match &args.query {
                Some(path) => {
                    info!("Loading query data from: {path:?}");
                    Some(load_matrix(path)?)
                }
                None => None,
            };
            let results =
                model.search_with_base(queries.as_ref().map(|q| q.view()), k, args.base)?;
            info!("Searched {} queries for {} max-kernels", results.n_queries(), k);

            if let Some(path) = &args.indices {
                save_columns(path, &results.indices)?;
                info!("Indices saved to: {path:?}");
            }
            if let Some(path) = &args.kernels {
                save_columns(path, &results.kernels)?;
                info!("Kernels saved to: {path:?}");
            }
        }
        None => {
            if args.query.is_some() || args.indices.is_some() || args.kernels.is_some() {
                warn!("No search performed because --k was not given");
            }
        }
    }

    if let Some(path) = &args.output_model {
        ModelFile::new(model).save_to_file(path)?;
        info!("Model saved to: {path:?}");
    }

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let model_type = read_model_type(&args.model)?;

    if model_type == DensityTree::MODEL_TYPE {
        ModelFile::<DensityTree>::load_from_file(&args.model)?.print_summary();
    } else if model_type == FastMksModel::MODEL_TYPE {
        ModelFile::<FastMksModel>::load_from_file(&args.model)?.print_summary();
    } else {
        return Err(TreeError::SerializationError(format!(
            "Unknown model type: {model_type}"
        )));
    }
    Ok(())
}

fn read_model_type(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let value: serde_json::Value = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| TreeError::SerializationError(e.to_string()))?;
    value["metadata"]["model_type"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| TreeError::SerializationError("Missing model type".to_string()))
}

fn write_values(path: &Path, values: &[f64]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for value in values {
        writeln!(writer, "{value}")?;
    }
    writer.flush()?;
    Ok(())
}

fn write_paths(tree: &mut DensityTree, format: PathFormat, path: &Path) -> Result<()> {
    let cacher = PathCacher::new(format, tree);
    let mut writer = BufWriter::new(File::create(path)?);
    for tag in cacher.tags() {
        let parent = cacher
            .parent_of(tag)?
            .map(|p| p.to_string())
            .unwrap_or_default();
        writeln!(writer, "{},{},{}", tag, parent, cacher.path_for(tag)?)?;
    }
    writer.flush()?;
    // Path caching tags every node; saved models carry leaf tags
    tree.tag_tree(false);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_one_of() {
        let some = Some(PathBuf::from("a.csv"));
        assert!(require_one_of(&some, "a", &None, "b").is_ok());
        assert!(require_one_of(&None, "a", &some, "b").is_ok());
        assert!(matches!(
            require_one_of(&some, "a", &some, "b"),
            Err(TreeError::ConflictingInputs(_))
        ));
        assert!(require_one_of(&None, "a", &None, "b").is_err());
    }

    #[test]
    fn test_parse_det_defaults() {
        let cli = Cli::try_parse_from(["rtrees", "det", "--data", "train.csv"]).unwrap();
        match cli.command {
            Commands::Det(args) => {
                assert_eq!(args.folds, 10);
                assert_eq!(args.max_leaf_size, 10);
                assert_eq!(args.min_leaf_size, 5);
                assert!(matches!(args.path_format, CliPathFormat::Lr));
                assert!(args.input_model.is_none());
            }
            _ => panic!("expected det command"),
        }
    }

    #[test]
    fn test_parse_fastmks_kernel_params() {
        let cli = Cli::try_parse_from([
            "rtrees", "fastmks", "--reference", "r.csv", "--kernel", "polynomial", "--degree",
            "3", "-k", "4",
        ])
        .unwrap();
        match cli.command {
            Commands::Fastmks(args) => {
                assert_eq!(args.k, Some(4));
                assert!(args.has_kernel_options());
                let params = args.kernel_params();
                assert_eq!(params.degree, 3.0);
                assert_eq!(params.offset, KernelParams::default().offset);
                assert_eq!(args.base, 2.0);
            }
            _ => panic!("expected fastmks command"),
        }
    }

    #[test]
    fn test_path_format_values() {
        let cli = Cli::try_parse_from(["rtrees", "det", "--data", "a.csv", "--path-format", "id-lr"])
            .unwrap();
        if let Commands::Det(args) = cli.command {
            assert_eq!(PathFormat::from(args.path_format), PathFormat::IdLr);
        }
        assert!(Cli::try_parse_from(["rtrees", "det", "--path-format", "rl"]).is_err());
    }

    #[test]
    fn test_write_paths_restores_leaf_tags() {
        let data = Array2::from_shape_fn((2, 40), |(i, j)| ((j * (i + 3)) % 17) as f64);
        let mut tree = DensityTree::grow(data.view(), 5, 2, false).unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();

        write_paths(&mut tree, PathFormat::LrId, file.path()).unwrap();
        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written.lines().count(), tree.num_leaves());

        let tags: Vec<Option<usize>> = tree
            .preorder()
            .into_iter()
            .filter(|&idx| !tree.is_leaf(idx))
            .map(|idx| tree.node(idx).tag)
            .collect();
        assert!(tags.iter().all(Option::is_none));
        let leaf_tags: Vec<Option<usize>> =
            tree.leaves().into_iter().map(|l| tree.node(l).tag).collect();
        let expected: Vec<Option<usize>> = (0..tree.num_leaves()).map(Some).collect();
        assert_eq!(leaf_tags, expected);
    }
}
