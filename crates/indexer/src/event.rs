use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use std::path::{Path, PathBuf};

/// A change notification for one path in the watched tree.
///
/// Events may arrive out of order relative to the actual filesystem
/// state, duplicated, or for paths that no longer exist; the
/// synchronizer's generation tracking absorbs all of that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

impl FileEvent {
    /// The path this event is primarily about (`to` for renames).
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(path) | Self::Modified(path) | Self::Deleted(path) => path,
            Self::Renamed { to, .. } => to,
        }
    }
}

/// Translate a raw notify event into zero or more [`FileEvent`]s.
///
/// Hidden files are skipped here so dotfile churn (editor swap files,
/// VCS metadata) never reaches the synchronizer.
pub(crate) fn convert_notify_event(event: &Event) -> Vec<FileEvent> {
    if let EventKind::Modify(ModifyKind::Name(mode)) = &event.kind {
        return convert_rename(mode, &event.paths);
    }

    event
        .paths
        .iter()
        .filter(|path| !is_hidden(path))
        .filter_map(|path| match &event.kind {
            EventKind::Create(_) => Some(FileEvent::Created(path.clone())),
            EventKind::Modify(_) | EventKind::Any | EventKind::Other => {
                Some(FileEvent::Modified(path.clone()))
            }
            EventKind::Remove(_) => Some(FileEvent::Deleted(path.clone())),
            EventKind::Access(_) => None,
        })
        .collect()
}

fn convert_rename(mode: &RenameMode, paths: &[PathBuf]) -> Vec<FileEvent> {
    match (mode, paths) {
        (RenameMode::Both, [from, to]) => {
            if is_hidden(to) {
                // Renamed into a hidden name: the tracked side goes away.
                vec![FileEvent::Deleted(from.clone())]
            } else {
                vec![FileEvent::Renamed {
                    from: from.clone(),
                    to: to.clone(),
                }]
            }
        }
        // Unpaired halves: the OS reported only one side of the move.
        (RenameMode::From, [from]) => vec![FileEvent::Deleted(from.clone())],
        (RenameMode::To, [to]) if !is_hidden(to) => vec![FileEvent::Created(to.clone())],
        _ => paths
            .iter()
            .filter(|path| !is_hidden(path))
            .map(|path| FileEvent::Modified(path.clone()))
            .collect(),
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind, RenameMode};
    use pretty_assertions::assert_eq;

    fn make_event(kind: EventKind, paths: Vec<PathBuf>) -> Event {
        Event {
            kind,
            paths,
            attrs: Default::default(),
        }
    }

    #[test]
    fn create_maps_to_created() {
        let path = PathBuf::from("/tmp/a.go");
        let event = make_event(EventKind::Create(CreateKind::File), vec![path.clone()]);
        assert_eq!(convert_notify_event(&event), vec![FileEvent::Created(path)]);
    }

    #[test]
    fn data_modify_maps_to_modified() {
        let path = PathBuf::from("/tmp/a.go");
        let event = make_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Any)),
            vec![path.clone()],
        );
        assert_eq!(
            convert_notify_event(&event),
            vec![FileEvent::Modified(path)]
        );
    }

    #[test]
    fn remove_maps_to_deleted() {
        let path = PathBuf::from("/tmp/a.go");
        let event = make_event(EventKind::Remove(RemoveKind::File), vec![path.clone()]);
        assert_eq!(convert_notify_event(&event), vec![FileEvent::Deleted(path)]);
    }

    #[test]
    fn paired_rename_maps_to_renamed() {
        let from = PathBuf::from("/tmp/a.go");
        let to = PathBuf::from("/tmp/b.go");
        let event = make_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            vec![from.clone(), to.clone()],
        );
        assert_eq!(
            convert_notify_event(&event),
            vec![FileEvent::Renamed { from, to }]
        );
    }

    #[test]
    fn unpaired_rename_halves_degrade() {
        let path = PathBuf::from("/tmp/a.go");
        let from_half = make_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            vec![path.clone()],
        );
        assert_eq!(
            convert_notify_event(&from_half),
            vec![FileEvent::Deleted(path.clone())]
        );

        let to_half = make_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            vec![path.clone()],
        );
        assert_eq!(
            convert_notify_event(&to_half),
            vec![FileEvent::Created(path)]
        );
    }

    #[test]
    fn hidden_paths_are_skipped() {
        let event = make_event(
            EventKind::Create(CreateKind::File),
            vec![PathBuf::from("/tmp/.a.go.swp")],
        );
        assert_eq!(convert_notify_event(&event), vec![]);
    }

    #[test]
    fn rename_into_hidden_name_deletes_source() {
        let from = PathBuf::from("/tmp/a.go");
        let event = make_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            vec![from.clone(), PathBuf::from("/tmp/.a.go.bak")],
        );
        assert_eq!(convert_notify_event(&event), vec![FileEvent::Deleted(from)]);
    }

    #[test]
    fn access_events_are_ignored() {
        let event = make_event(
            EventKind::Access(notify::event::AccessKind::Read),
            vec![PathBuf::from("/tmp/a.go")],
        );
        assert_eq!(convert_notify_event(&event), vec![]);
    }
}
