//! Stage planning.
//!
//! The stage list is fixed from the flags before anything runs. A
//! transformation that is switched off is replaced by a plain copy or move
//! so the next stage always finds its input where it expects it.

use crate::config::StageFlags;
use crate::core::classify::CanonicalFormat;
use crate::core::report::StageKind;
use std::path::{Path, PathBuf};

/// Name of the cache subdirectory used when format separation is off
pub const UNSORTED_DIR: &str = "tmp";

/// Build the ordered stage list for a run
pub fn plan_stages(flags: &StageFlags) -> Vec<StageKind> {
    let mut stages = Vec::with_capacity(5);

    stages.push(if flags.by_mode {
        StageKind::FormatSeparation
    } else {
        StageKind::SourceCopy
    });

    if flags.clear_duplicate {
        stages.push(StageKind::Deduplication);
    }

    stages.push(if flags.by_quality {
        StageKind::QualitySeparation
    } else {
        StageKind::MoveToOutput
    });

    if flags.clear_cache {
        stages.push(StageKind::CacheCleanup);
        stages.push(StageKind::PruneCache);
    }

    stages
}

/// A cache directory the middle stages work on, and where its files end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDir {
    pub cache: PathBuf,
    pub output: PathBuf,
}

/// Working directories for a run: one per canonical format when sorting
/// by format, a single `tmp` directory otherwise
pub fn working_dirs(cache_root: &Path, output_root: &Path, by_mode: bool) -> Vec<WorkingDir> {
    if by_mode {
        CanonicalFormat::ALL
            .iter()
            .map(|format| WorkingDir {
                cache: cache_root.join(format.dir_name()),
                output: output_root.join(format.dir_name()),
            })
            .collect()
    } else {
        vec![WorkingDir {
            cache: cache_root.join(UNSORTED_DIR),
            output: output_root.to_path_buf(),
        }]
    }
}

/// Cache subdirectories the pipeline itself creates, and the only places
/// cache cleanup deletes from
pub fn cache_artifact_dirs(cache_root: &Path) -> Vec<PathBuf> {
    CanonicalFormat::ALL
        .iter()
        .map(|format| cache_root.join(format.dir_name()))
        .chain(std::iter::once(cache_root.join(UNSORTED_DIR)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(by_mode: bool, by_quality: bool, clear_duplicate: bool, clear_cache: bool) -> StageFlags {
        StageFlags {
            by_mode,
            by_quality,
            clear_duplicate,
            clear_cache,
        }
    }

    #[test]
    fn default_plan() {
        assert_eq!(
            plan_stages(&StageFlags::default()),
            vec![
                StageKind::SourceCopy,
                StageKind::Deduplication,
                StageKind::QualitySeparation,
                StageKind::CacheCleanup,
                StageKind::PruneCache,
            ]
        );
    }

    #[test]
    fn everything_on() {
        assert_eq!(
            plan_stages(&flags(true, true, true, true)),
            vec![
                StageKind::FormatSeparation,
                StageKind::Deduplication,
                StageKind::QualitySeparation,
                StageKind::CacheCleanup,
                StageKind::PruneCache,
            ]
        );
    }

    #[test]
    fn everything_off_still_moves_files_through() {
        assert_eq!(
            plan_stages(&flags(false, false, false, false)),
            vec![StageKind::SourceCopy, StageKind::MoveToOutput]
        );
    }

    #[test]
    fn deduplication_runs_before_quality_split() {
        let plan = plan_stages(&flags(true, true, true, false));
        let dedup = plan.iter().position(|s| *s == StageKind::Deduplication).unwrap();
        let split = plan.iter().position(|s| *s == StageKind::QualitySeparation).unwrap();
        assert!(dedup < split);
    }

    #[test]
    fn working_dirs_follow_format_mode() {
        let by_format = working_dirs(Path::new("/c"), Path::new("/o"), true);
        assert_eq!(by_format.len(), 2);
        assert_eq!(by_format[0].cache, PathBuf::from("/c/JPEG"));
        assert_eq!(by_format[1].output, PathBuf::from("/o/PNG"));

        let unsorted = working_dirs(Path::new("/c"), Path::new("/o"), false);
        assert_eq!(
            unsorted,
            vec![WorkingDir {
                cache: PathBuf::from("/c/tmp"),
                output: PathBuf::from("/o"),
            }]
        );
    }

    #[test]
    fn cleanup_covers_only_pipeline_dirs() {
        assert_eq!(
            cache_artifact_dirs(Path::new("/c")),
            vec![
                PathBuf::from("/c/JPEG"),
                PathBuf::from("/c/PNG"),
                PathBuf::from("/c/tmp"),
            ]
        );
    }
}
