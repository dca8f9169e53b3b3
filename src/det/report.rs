//! Reports over a trained density tree
//!
//! Both reports go to a file when a destination is given and to stdout
//! otherwise.

use crate::core::{Result, TreeError};
use crate::det::dtree::DensityTree;
use log::info;
use ndarray::{Array2, ArrayView2, Axis};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Per-leaf class histogram of labeled points
///
/// Row `i` counts the points reaching the leaf tagged `i` (leaves-only
/// tagging), column `c` the points labeled `c`. Points are routed by the
/// splits alone, so points outside the root box still land in a leaf.
pub fn leaf_membership(
    tree: &mut DensityTree,
    data: ArrayView2<f64>,
    labels: &[usize],
    num_classes: usize,
) -> Result<Array2<usize>> {
    if labels.len() != data.ncols() {
        return Err(TreeError::InvalidParameter(format!(
            "Got {} labels for {} points",
            labels.len(),
            data.ncols()
        )));
    }
    if data.nrows() != tree.n_dims() {
        return Err(TreeError::DimensionMismatch {
            expected: tree.n_dims(),
            actual: data.nrows(),
        });
    }

    let num_leaves = tree.tag_tree(false);
    let mut table = Array2::zeros((num_leaves, num_classes));
    for (point, &label) in data.axis_iter(Axis(1)).zip(labels) {
        if label >= num_classes {
            return Err(TreeError::InvalidParameter(format!(
                "Label {} out of range for {} classes",
                label, num_classes
            )));
        }
        if let Some(tag) = tree.leaf_tag(point) {
            table[[tag, label]] += 1;
        }
    }
    Ok(table)
}

/// Write the leaf membership table, one leaf per line
pub fn print_leaf_membership(
    tree: &mut DensityTree,
    data: ArrayView2<f64>,
    labels: &[usize],
    num_classes: usize,
    destination: Option<&Path>,
) -> Result<()> {
    let table = leaf_membership(tree, data, labels, num_classes)?;
    let mut out = open_destination(destination)?;
    for row in table.rows() {
        let line: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        writeln!(out, "{}", line.join(","))?;
    }
    out.flush()?;
    if let Some(path) = destination {
        info!("Leaf membership written to {}", path.display());
    }
    Ok(())
}

/// Write the importance of every dimension, one `dim,importance` pair per line
pub fn print_variable_importance(tree: &DensityTree, destination: Option<&Path>) -> Result<()> {
    let importance = tree.variable_importance();
    let mut out = open_destination(destination)?;
    for (dim, value) in importance.iter().enumerate() {
        writeln!(out, "{},{}", dim, value)?;
    }
    out.flush()?;
    if let Some(path) = destination {
        info!("Variable importance written to {}", path.display());
    }
    Ok(())
}

fn open_destination(destination: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match destination {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    })
}
