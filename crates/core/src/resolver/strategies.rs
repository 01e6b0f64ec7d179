//! Ordered lookup strategies. The first one that finds an acceptable file
//! wins.

use std::path::PathBuf;

use super::search::{Scope, SearchContext};

pub type Strategy = fn(&SearchContext<'_>) -> Option<PathBuf>;

/// Every strategy, in the order they are tried, with the name used in logs.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("document-dir", document_dir as Strategy),
    ("export-root", export_root as Strategy),
    ("sibling-attachments", sibling_attachments as Strategy),
    ("root-attachments", root_attachments as Strategy),
    ("near-search", near_search as Strategy),
    ("nested-attachments", nested_attachments as Strategy),
    ("shallow-root-attachments", shallow_root_attachments as Strategy),
    ("wide-search", wide_search as Strategy),
    ("top-level-folder", top_level_folder as Strategy),
    ("any-attachments", any_attachments as Strategy),
    ("whole-vault", whole_vault as Strategy),
];

const NEAR_DEPTH: usize = 3;
const WIDE_DEPTHS: [usize; 2] = [5, 10];
const SHALLOW_ATTACHMENTS_DEPTH: usize = 2;

fn document_dir(ctx: &SearchContext<'_>) -> Option<PathBuf> {
    ctx.direct(ctx.document_dir)
}

fn export_root(ctx: &SearchContext<'_>) -> Option<PathBuf> {
    ctx.direct(ctx.export_root)
}

fn sibling_attachments(ctx: &SearchContext<'_>) -> Option<PathBuf> {
    ctx.attachment_dirs_in(ctx.document_dir).iter().find_map(|dir| ctx.direct(dir))
}

fn root_attachments(ctx: &SearchContext<'_>) -> Option<PathBuf> {
    ctx.attachment_dirs_in(ctx.export_root).iter().find_map(|dir| ctx.direct(dir))
}

fn near_search(ctx: &SearchContext<'_>) -> Option<PathBuf> {
    ctx.search(ctx.document_dir, Some(NEAR_DEPTH), Scope::Anywhere)
}

fn nested_attachments(ctx: &SearchContext<'_>) -> Option<PathBuf> {
    ctx.search(ctx.document_dir, None, Scope::InAttachments(None))
}

fn shallow_root_attachments(ctx: &SearchContext<'_>) -> Option<PathBuf> {
    ctx.search(ctx.export_root, None, Scope::InAttachments(Some(SHALLOW_ATTACHMENTS_DEPTH)))
}

fn wide_search(ctx: &SearchContext<'_>) -> Option<PathBuf> {
    WIDE_DEPTHS
        .iter()
        .find_map(|&depth| ctx.search(ctx.document_dir, Some(depth), Scope::Anywhere))
}

fn top_level_folder(ctx: &SearchContext<'_>) -> Option<PathBuf> {
    let top = ctx.top_level_folder()?;
    ctx.search(&top, None, Scope::Anywhere)
}

fn any_attachments(ctx: &SearchContext<'_>) -> Option<PathBuf> {
    ctx.search(ctx.export_root, None, Scope::InAttachments(None))
}

fn whole_vault(ctx: &SearchContext<'_>) -> Option<PathBuf> {
    ctx.search(ctx.export_root, None, Scope::Anywhere)
}
