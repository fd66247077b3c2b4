//! CLI command: apply a translated CSV back onto its resource

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::export::extract_member;
use crate::formats::translation::{TranslationResource, import_messages};
use crate::pck::PckTool;

pub fn run(csv_path: &Path, pck: Option<&Path>, locale: &str) -> anyhow::Result<()> {
    let file_name = csv_path
        .file_name()
        .and_then(|name| name.to_str())
        .context("invalid CSV path")?;

    // "text.en.translation.csv" targets "text.en.translation"
    let member = if file_name.to_lowercase().ends_with(".csv") {
        &file_name[..file_name.len() - 4]
    } else {
        file_name
    };

    let target = if let Some(pck) = pck {
        println!("Extracting base file {member} from {}...", pck.display());
        extract_member(pck, member)?
    } else {
        let path = PathBuf::from(member);
        anyhow::ensure!(
            path.exists(),
            "target file not found: {member} (use --pck to extract the original first)"
        );
        path
    };

    let messages = import_messages(csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;

    let mut resource = TranslationResource::open(&target)
        .with_context(|| format!("failed to read {}", target.display()))?;
    resource
        .replace(&messages)
        .with_context(|| format!("{} does not match this table", csv_path.display()))?;
    resource.set_locale(locale);
    resource.save(&target)?;
    println!("Applied {} messages to {}", messages.len(), target.display());

    if let Some(pck) = pck {
        let workdir = std::env::current_dir()?;
        let relative = target.strip_prefix(&workdir).unwrap_or(&target);
        PckTool::locate().add(pck, &[relative.to_path_buf()])?;
        println!("Repacked {member} into {}", pck.display());
    }
    Ok(())
}
