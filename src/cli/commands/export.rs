//! CLI command: export a translation table to CSV

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::formats::translation::{TranslationResource, export_messages};
use crate::pck::PckTool;

pub fn run(file: &str, pck: Option<&Path>, output: Option<&Path>) -> anyhow::Result<()> {
    let source = if let Some(pck) = pck {
        println!("Extracting {file} from {}...", pck.display());
        extract_member(pck, file)?
    } else {
        let path = PathBuf::from(file);
        anyhow::ensure!(
            path.exists(),
            "file not found: {} (use --pck to extract it from an archive)",
            path.display()
        );
        path
    };

    let resource = TranslationResource::open(&source)
        .with_context(|| format!("failed to read {}", source.display()))?;
    let messages = resource.get_messages()?;

    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{file}.csv")));
    let count = export_messages(&messages, &output_path)?;

    println!(
        "Exported {} messages ({}) to {}",
        count,
        resource.locale(),
        output_path.display()
    );
    println!("Fill in the \"translated\" column and re-import with: gdtrans import");
    Ok(())
}

/// Extract one member into the working directory and locate the file the
/// tool produced (it recreates the member's directory layout).
pub(crate) fn extract_member(pck: &Path, member: &str) -> anyhow::Result<PathBuf> {
    let workdir = std::env::current_dir()?;
    PckTool::locate().extract(pck, member, &workdir)?;
    find_extracted(&workdir, member).with_context(|| {
        format!(
            "extracted {member} but could not find it under {}",
            workdir.display()
        )
    })
}

fn find_extracted(root: &Path, name: &str) -> Option<PathBuf> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name().to_str() == Some(name))
        .map(walkdir::DirEntry::into_path)
}
