//! Action executor: applying the configured action to group members.
//!
//! ## What we do here
//! - Walk every group and act on each non-representative member.
//! - Keep faults per file: one unwritable path becomes a `Failed` record,
//!   never a job error.
//! - Stay idempotent: members whose source file is already gone are
//!   `Skipped`, so reruns over a half-finished tree finish the remainder.
//! - In dry-run mode compute everything, including collision-free
//!   destination names, without touching the filesystem.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{ActionConfig, ActionKind};
use crate::types::{ActionOutcome, ActionRecord, ActionSummary, DuplicateGroup};

/// Apply `cfg.action` to every duplicate member of every group.
///
/// Representatives are never touched. The returned summary carries one
/// record per considered member.
pub fn execute_actions(groups: &[DuplicateGroup], cfg: &ActionConfig) -> ActionSummary {
    let mut summary = ActionSummary {
        dry_run: cfg.dry_run,
        ..ActionSummary::default()
    };
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    // One upfront mkdir for transfer actions; its failure fails each
    // member record rather than the job.
    let mut destination_error: Option<String> = None;
    if cfg.action.needs_destination() && !cfg.dry_run {
        match &cfg.destination {
            Some(dir) => {
                if let Err(err) = fs::create_dir_all(dir) {
                    destination_error = Some(format!("cannot create {}: {err}", dir.display()));
                }
            }
            None => destination_error = Some("no destination configured".to_string()),
        }
    }

    for group in groups {
        for member in &group.members {
            if *member == group.representative {
                continue;
            }
            let record = match cfg.action {
                ActionKind::Show => show_member(member, cfg.dry_run),
                ActionKind::Delete => delete_member(member, cfg.dry_run),
                ActionKind::Copy | ActionKind::Move => {
                    transfer_member(member, cfg, &mut claimed, destination_error.as_deref())
                }
            };
            debug!(
                id = %record.id,
                outcome = ?record.outcome,
                action = cfg.action.name(),
                "action_record"
            );
            summary.push(record);
        }
    }

    info!(
        action = cfg.action.name(),
        dry_run = cfg.dry_run,
        applied = summary.applied,
        planned = summary.planned,
        skipped = summary.skipped,
        failed = summary.failed,
        "actions_complete"
    );
    summary
}

fn show_member(member: &str, dry_run: bool) -> ActionRecord {
    ActionRecord {
        id: member.to_string(),
        outcome: if dry_run {
            ActionOutcome::Planned
        } else {
            ActionOutcome::Applied
        },
        destination: None,
        error: None,
    }
}

fn delete_member(member: &str, dry_run: bool) -> ActionRecord {
    let source = Path::new(member);
    if !source.exists() {
        return skipped(member);
    }
    if dry_run {
        return ActionRecord {
            id: member.to_string(),
            outcome: ActionOutcome::Planned,
            destination: None,
            error: None,
        };
    }
    match fs::remove_file(source) {
        Ok(()) => ActionRecord {
            id: member.to_string(),
            outcome: ActionOutcome::Applied,
            destination: None,
            error: None,
        },
        Err(err) => failed(member, None, err.to_string()),
    }
}

fn transfer_member(
    member: &str,
    cfg: &ActionConfig,
    claimed: &mut HashSet<PathBuf>,
    destination_error: Option<&str>,
) -> ActionRecord {
    let Some(dir) = &cfg.destination else {
        return failed(member, None, "no destination configured".to_string());
    };
    let source = Path::new(member);
    if !source.exists() {
        return skipped(member);
    }

    let target = collision_free_name(dir, source, claimed);
    let destination = Some(target.display().to_string());
    if cfg.dry_run {
        return ActionRecord {
            id: member.to_string(),
            outcome: ActionOutcome::Planned,
            destination,
            error: None,
        };
    }
    if let Some(reason) = destination_error {
        return failed(member, destination, reason.to_string());
    }

    let result = match cfg.action {
        ActionKind::Copy => fs::copy(source, &target).map(|_| ()),
        ActionKind::Move => move_file(source, &target),
        _ => unreachable!("transfer_member only handles copy and move"),
    };
    match result {
        Ok(()) => ActionRecord {
            id: member.to_string(),
            outcome: ActionOutcome::Applied,
            destination,
            error: None,
        },
        Err(err) => failed(member, destination, err.to_string()),
    }
}

/// Rename first; cross-device moves fall back to copy + remove.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

/// Pick a name under `dir` that collides with neither existing files nor
/// names already handed out this run. `name.ext`, then `name-1.ext`, ...
fn collision_free_name(dir: &Path, source: &Path, claimed: &mut HashSet<PathBuf>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let extension = source.extension().map(|e| e.to_string_lossy().into_owned());

    let mut attempt = 0u32;
    loop {
        let name = match (&extension, attempt) {
            (Some(ext), 0) => format!("{stem}.{ext}"),
            (Some(ext), n) => format!("{stem}-{n}.{ext}"),
            (None, 0) => stem.clone(),
            (None, n) => format!("{stem}-{n}"),
        };
        let candidate = dir.join(name);
        if !candidate.exists() && !claimed.contains(&candidate) {
            claimed.insert(candidate.clone());
            return candidate;
        }
        attempt += 1;
    }
}

fn skipped(member: &str) -> ActionRecord {
    ActionRecord {
        id: member.to_string(),
        outcome: ActionOutcome::Skipped,
        destination: None,
        error: None,
    }
}

fn failed(member: &str, destination: Option<String>, error: String) -> ActionRecord {
    ActionRecord {
        id: member.to_string(),
        outcome: ActionOutcome::Failed,
        destination,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn group(representative: &str, members: &[&str]) -> DuplicateGroup {
        DuplicateGroup {
            representative: representative.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            score: 0.95,
        }
    }

    fn touch(dir: &TempDir, name: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, b"pixels").expect("write fixture");
        path.display().to_string()
    }

    #[test]
    fn show_reports_without_touching_anything() {
        let dir = TempDir::new().expect("tempdir");
        let a = touch(&dir, "a.png");
        let b = touch(&dir, "b.png");
        let groups = vec![group(&a, &[&a, &b])];

        let summary = execute_actions(&groups, &ActionConfig::default());
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.records.len(), 1);
        assert_eq!(summary.records[0].id, b);
        assert!(Path::new(&a).exists());
        assert!(Path::new(&b).exists());
    }

    #[test]
    fn representative_is_never_acted_on() {
        let dir = TempDir::new().expect("tempdir");
        let a = touch(&dir, "a.png");
        let b = touch(&dir, "b.png");
        let groups = vec![group(&a, &[&a, &b])];

        let cfg = ActionConfig {
            action: ActionKind::Delete,
            destination: None,
            dry_run: false,
            confirm_delete: true,
        };
        let summary = execute_actions(&groups, &cfg);

        assert_eq!(summary.applied, 1);
        assert!(Path::new(&a).exists(), "representative must survive");
        assert!(!Path::new(&b).exists());
    }

    #[test]
    fn dry_run_copy_plans_but_leaves_filesystem_alone() {
        let src = TempDir::new().expect("tempdir");
        let dst = TempDir::new().expect("tempdir");
        let a = touch(&src, "a.png");
        let b = touch(&src, "b.png");
        let groups = vec![group(&a, &[&a, &b])];

        let cfg = ActionConfig {
            action: ActionKind::Copy,
            destination: Some(dst.path().to_path_buf()),
            dry_run: true,
            confirm_delete: false,
        };
        let summary = execute_actions(&groups, &cfg);

        assert_eq!(summary.planned, 1);
        assert_eq!(summary.applied, 0);
        assert!(summary.records[0].destination.is_some());
        assert_eq!(
            fs::read_dir(dst.path()).expect("read destination").count(),
            0,
            "dry run must not create files"
        );
    }

    #[test]
    fn copy_renames_on_collision() {
        let src = TempDir::new().expect("tempdir");
        let dst = TempDir::new().expect("tempdir");
        // Same basename in two groups collides at the destination.
        fs::create_dir(src.path().join("x")).expect("mkdir");
        fs::create_dir(src.path().join("y")).expect("mkdir");
        let a1 = touch(&src, "x/dup.png");
        let a2 = touch(&src, "x/keep.png");
        let b1 = touch(&src, "y/dup.png");
        let b2 = touch(&src, "y/keep.png");
        let groups = vec![group(&a2, &[&a1, &a2]), group(&b2, &[&b1, &b2])];

        let cfg = ActionConfig {
            action: ActionKind::Copy,
            destination: Some(dst.path().to_path_buf()),
            dry_run: false,
            confirm_delete: false,
        };
        let summary = execute_actions(&groups, &cfg);

        assert_eq!(summary.applied, 2);
        assert!(dst.path().join("dup.png").exists());
        assert!(dst.path().join("dup-1.png").exists());
        assert!(Path::new(&a1).exists(), "copy keeps sources");
    }

    #[test]
    fn dry_run_destinations_are_also_collision_free() {
        let src = TempDir::new().expect("tempdir");
        let dst = TempDir::new().expect("tempdir");
        fs::create_dir(src.path().join("x")).expect("mkdir");
        fs::create_dir(src.path().join("y")).expect("mkdir");
        let a1 = touch(&src, "x/dup.png");
        let a2 = touch(&src, "x/keep.png");
        let b1 = touch(&src, "y/dup.png");
        let b2 = touch(&src, "y/keep.png");
        let groups = vec![group(&a2, &[&a1, &a2]), group(&b2, &[&b1, &b2])];

        let cfg = ActionConfig {
            action: ActionKind::Copy,
            destination: Some(dst.path().to_path_buf()),
            dry_run: true,
            confirm_delete: false,
        };
        let summary = execute_actions(&groups, &cfg);

        let destinations: Vec<&String> = summary
            .records
            .iter()
            .filter_map(|r| r.destination.as_ref())
            .collect();
        assert_eq!(destinations.len(), 2);
        assert_ne!(destinations[0], destinations[1]);
    }

    #[test]
    fn move_removes_sources() {
        let src = TempDir::new().expect("tempdir");
        let dst = TempDir::new().expect("tempdir");
        let a = touch(&src, "a.png");
        let b = touch(&src, "b.png");
        let groups = vec![group(&a, &[&a, &b])];

        let cfg = ActionConfig {
            action: ActionKind::Move,
            destination: Some(dst.path().to_path_buf()),
            dry_run: false,
            confirm_delete: false,
        };
        let summary = execute_actions(&groups, &cfg);

        assert_eq!(summary.applied, 1);
        assert!(!Path::new(&b).exists());
        assert!(dst.path().join("b.png").exists());
    }

    #[test]
    fn rerun_after_move_skips_missing_sources() {
        let src = TempDir::new().expect("tempdir");
        let dst = TempDir::new().expect("tempdir");
        let a = touch(&src, "a.png");
        let b = touch(&src, "b.png");
        let groups = vec![group(&a, &[&a, &b])];

        let cfg = ActionConfig {
            action: ActionKind::Move,
            destination: Some(dst.path().to_path_buf()),
            dry_run: false,
            confirm_delete: false,
        };
        let first = execute_actions(&groups, &cfg);
        assert_eq!(first.applied, 1);

        let second = execute_actions(&groups, &cfg);
        assert_eq!(second.applied, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(
            fs::read_dir(dst.path()).expect("read destination").count(),
            1,
            "rerun must not duplicate moved files"
        );
    }

    #[test]
    fn missing_member_skips_without_failing() {
        let groups = vec![group("keep.png", &["keep.png", "/no/such/dir/gone.png"])];

        let cfg = ActionConfig {
            action: ActionKind::Delete,
            destination: None,
            dry_run: false,
            confirm_delete: true,
        };
        let summary = execute_actions(&groups, &cfg);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn collision_names_count_upward() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("img.png"), b"x").expect("fixture");
        fs::write(dir.path().join("img-1.png"), b"x").expect("fixture");

        let mut claimed = HashSet::new();
        let first = collision_free_name(dir.path(), Path::new("/tmp/img.png"), &mut claimed);
        assert_eq!(first, dir.path().join("img-2.png"));

        // Claimed names block reuse even before anything is written.
        let second = collision_free_name(dir.path(), Path::new("/tmp/img.png"), &mut claimed);
        assert_eq!(second, dir.path().join("img-3.png"));
    }
}
