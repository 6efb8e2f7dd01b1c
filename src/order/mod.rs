//! Stable ordering and convention substitution for declared files.
//!
//! Resolution runs in two passes:
//! 1. ordering — declared priority is the primary key, declaration
//!    sequence breaks ties, and every declared dependency is placed
//!    before its dependent (an unresolvable cycle is fatal);
//! 2. conventions — each registered naming convention may rewrite a
//!    file's path, applied in registration order so each sees the
//!    previous convention's output.

pub mod convention;

pub use convention::{ConventionContext, FileConvention, MinifiedFilePathConvention};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::WebFile;
use crate::error::{Result, SmeltError};

/// Resolve the final processing order for a declared file set.
///
/// Dependencies referencing paths outside the set are ignored; they may
/// be satisfied by another bundle on the page.
pub fn resolve(
    declared: Vec<WebFile>,
    conventions: &[Box<dyn FileConvention>],
    ctx: &ConventionContext<'_>,
) -> Result<Vec<WebFile>> {
    let ordered = order_files(declared)?;
    Ok(apply_conventions(ordered, conventions, ctx))
}

/// Stable priority sort followed by dependency linearization.
fn order_files(declared: Vec<WebFile>) -> Result<Vec<WebFile>> {
    let mut files = declared;
    // Stable: same-priority ties keep declaration sequence.
    files.sort_by_key(|f| f.order);

    let index_of: FxHashMap<&str, usize> = files
        .iter()
        .enumerate()
        .map(|(i, f)| (f.path.as_str(), i))
        .collect();

    let mut emitted: Vec<usize> = Vec::with_capacity(files.len());
    let mut done: FxHashSet<usize> = FxHashSet::default();
    let mut in_stack: Vec<usize> = Vec::new();

    for i in 0..files.len() {
        visit(i, &files, &index_of, &mut done, &mut in_stack, &mut emitted)?;
    }

    // Take files out in emission order without cloning.
    let mut slots: Vec<Option<WebFile>> = files.into_iter().map(Some).collect();
    Ok(emitted
        .into_iter()
        .map(|i| slots[i].take().unwrap_or_else(|| unreachable!()))
        .collect())
}

/// Depth-first emit of `i` after its dependencies, with a recursion-stack
/// marker for cycle detection.
fn visit(
    i: usize,
    files: &[WebFile],
    index_of: &FxHashMap<&str, usize>,
    done: &mut FxHashSet<usize>,
    in_stack: &mut Vec<usize>,
    emitted: &mut Vec<usize>,
) -> Result<()> {
    if done.contains(&i) {
        return Ok(());
    }
    if let Some(pos) = in_stack.iter().position(|&s| s == i) {
        let mut members: Vec<String> =
            in_stack[pos..].iter().map(|&s| files[s].path.clone()).collect();
        members.push(files[i].path.clone());
        return Err(SmeltError::DependencyCycle { members });
    }

    in_stack.push(i);
    for dep in &files[i].dependencies {
        if let Some(&dep_idx) = index_of.get(dep.as_str()) {
            visit(dep_idx, files, index_of, done, in_stack, emitted)?;
        }
    }
    in_stack.pop();

    done.insert(i);
    emitted.push(i);
    Ok(())
}

/// Run every convention over every local file, in registration order.
fn apply_conventions(
    files: Vec<WebFile>,
    conventions: &[Box<dyn FileConvention>],
    ctx: &ConventionContext<'_>,
) -> Vec<WebFile> {
    files
        .into_iter()
        .map(|mut file| {
            if file.is_external() {
                return file;
            }
            for convention in conventions {
                if let Some(rewritten) = convention.apply(&file.path, ctx) {
                    crate::debug!(
                        "order";
                        "{}: {} -> {}", convention.name(), file.path, rewritten
                    );
                    file.path = rewritten;
                }
            }
            file
        })
        .collect()
}
