use notify::{
    event::{CreateKind, ModifyKind, RemoveKind, RenameMode},
    EventKind,
};
use std::path::{Path, PathBuf};

/// A local filesystem change, consumed exactly once by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    Created { path: PathBuf, is_dir: bool },
    Modified { path: PathBuf, is_dir: bool },
    Deleted { path: PathBuf, is_dir: bool },
    Renamed { from: PathBuf, to: PathBuf, is_dir: bool },
}

impl ChangeEvent {
    /// Source path: the only path, or the origin of a rename.
    pub fn path(&self) -> &Path {
        match self {
            ChangeEvent::Created { path, .. }
            | ChangeEvent::Modified { path, .. }
            | ChangeEvent::Deleted { path, .. } => path,
            ChangeEvent::Renamed { from, .. } => from,
        }
    }

    pub fn is_dir(&self) -> bool {
        match self {
            ChangeEvent::Created { is_dir, .. }
            | ChangeEvent::Modified { is_dir, .. }
            | ChangeEvent::Deleted { is_dir, .. }
            | ChangeEvent::Renamed { is_dir, .. } => *is_dir,
        }
    }
}

/// Turns raw `notify` events into [`ChangeEvent`]s.
///
/// Backends that report a rename as a `From` half followed by a `To` half
/// are paired here, but only when both halves carry the same tracker
/// (the inotify move cookie). inotify additionally emits a `Both` event
/// after matched halves; that duplicate is dropped. A `From` with no
/// matching `To` means the file left the watched tree and is reported as a
/// deletion once an unrelated event arrives or [`EventClassifier::flush`]
/// is called.
#[derive(Debug, Default)]
pub struct EventClassifier {
    pending_from: Option<(PathBuf, Option<usize>)>,
    last_pair: Option<(PathBuf, PathBuf)>,
}

impl EventClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, event: notify::Event) -> Vec<ChangeEvent> {
        let mut out = Vec::new();
        let kind = event.kind;
        let tracker = event.attrs.tracker();
        let mut paths = event.paths;

        if let EventKind::Modify(ModifyKind::Name(mode)) = kind {
            match mode {
                RenameMode::From => {
                    out.extend(self.flush());
                    self.pending_from = paths.into_iter().next().map(|p| (p, tracker));
                    return out;
                }
                RenameMode::To => {
                    let Some(to) = paths.into_iter().next() else { return out };
                    match self.pending_from.take() {
                        Some((from, from_tracker)) if from_tracker == tracker => {
                            self.last_pair = Some((from.clone(), to.clone()));
                            out.push(renamed(from, to));
                        }
                        unmatched => {
                            if let Some((from, _)) = unmatched {
                                out.push(ChangeEvent::Deleted { path: from, is_dir: false });
                            }
                            out.push(ChangeEvent::Created { is_dir: to.is_dir(), path: to });
                        }
                    }
                    return out;
                }
                RenameMode::Both if paths.len() == 2 => {
                    out.extend(self.flush());
                    let to = paths.pop().unwrap_or_default();
                    let from = paths.pop().unwrap_or_default();
                    let pair = (from, to);
                    if self.last_pair.as_ref() == Some(&pair) {
                        self.last_pair = None;
                    } else {
                        out.push(renamed(pair.0, pair.1));
                    }
                    return out;
                }
                RenameMode::Any => {
                    // only one side known, look at the disk to guess which
                    out.extend(self.flush());
                    for p in paths {
                        if p.exists() {
                            out.push(ChangeEvent::Created { is_dir: p.is_dir(), path: p });
                        } else {
                            out.push(ChangeEvent::Deleted { path: p, is_dir: false });
                        }
                    }
                    return out;
                }
                _ => {}
            }
        }

        out.extend(self.flush());
        self.last_pair = None;
        match kind {
            EventKind::Create(CreateKind::Folder) => {
                for p in paths {
                    out.push(ChangeEvent::Created { path: p, is_dir: true });
                }
            }
            EventKind::Create(_) => {
                for p in paths {
                    out.push(ChangeEvent::Created { is_dir: p.is_dir(), path: p });
                }
            }
            EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Metadata(_))
            | EventKind::Modify(ModifyKind::Any) => {
                for p in paths {
                    out.push(ChangeEvent::Modified { is_dir: p.is_dir(), path: p });
                }
            }
            EventKind::Remove(RemoveKind::Folder) => {
                for p in paths {
                    out.push(ChangeEvent::Deleted { path: p, is_dir: true });
                }
            }
            EventKind::Remove(_) => {
                for p in paths {
                    out.push(ChangeEvent::Deleted { path: p, is_dir: false });
                }
            }
            _ => {}
        }
        out
    }

    /// A `From` half is waiting for its `To` half.
    pub fn has_pending(&self) -> bool {
        self.pending_from.is_some()
    }

    /// Emit the deletion for a rename whose destination never showed up.
    pub fn flush(&mut self) -> Option<ChangeEvent> {
        self.pending_from
            .take()
            .map(|(path, _)| ChangeEvent::Deleted { path, is_dir: false })
    }
}

fn renamed(from: PathBuf, to: PathBuf) -> ChangeEvent {
    let is_dir = to.is_dir();
    ChangeEvent::Renamed { from, to, is_dir }
}
