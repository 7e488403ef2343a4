//! In-memory remote host used by the unit tests.

use crate::remote::{RemoteEndpoint, RemoteError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Dir,
    File(Vec<u8>),
}

#[derive(Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    calls: Vec<String>,
    denied_mkdir: HashSet<String>,
    deny_writes: bool,
    fail_renames: bool,
    disconnected: bool,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct FakeRemote {
    state: Arc<Mutex<State>>,
}

fn parent(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((p, _)) => p,
    }
}

impl FakeRemote {
    pub fn new() -> Self {
        let remote = Self::default();
        remote.state.lock().unwrap().nodes.insert("/".into(), Node::Dir);
        remote
    }

    pub fn add_dir(&self, path: &str) {
        let mut st = self.state.lock().unwrap();
        let mut prefix = String::new();
        for part in path.split('/').filter(|s| !s.is_empty()) {
            prefix.push('/');
            prefix.push_str(part);
            st.nodes.insert(prefix.clone(), Node::Dir);
        }
    }

    pub fn add_file(&self, path: &str, content: &[u8]) {
        self.add_dir(parent(path));
        self.state
            .lock()
            .unwrap()
            .nodes
            .insert(path.into(), Node::File(content.to_vec()));
    }

    pub fn node(&self, path: &str) -> Option<Node> {
        self.state.lock().unwrap().nodes.get(path).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn deny_mkdir(&self, path: &str) {
        self.state.lock().unwrap().denied_mkdir.insert(path.into());
    }

    pub fn deny_writes(&self) {
        self.state.lock().unwrap().deny_writes = true;
    }

    pub fn fail_renames(&self) {
        self.state.lock().unwrap().fail_renames = true;
    }

    pub fn disconnect(&self) {
        self.state.lock().unwrap().disconnected = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn begin(&self, call: String) -> Result<std::sync::MutexGuard<'_, State>, RemoteError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(call);
        if st.disconnected {
            return Err(RemoteError::Disconnected("session closed".into()));
        }
        Ok(st)
    }
}

#[async_trait]
impl RemoteEndpoint for FakeRemote {
    async fn write(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let mut st = self.begin(format!("write {remote}"))?;
        let content = std::fs::read(local)?;
        if st.nodes.get(parent(remote)) != Some(&Node::Dir) {
            return Err(RemoteError::NotFound(remote.into()));
        }
        if st.deny_writes {
            return Err(RemoteError::Failure("permission denied".into()));
        }
        st.nodes.insert(remote.into(), Node::File(content));
        Ok(())
    }

    async fn remove(&self, remote: &str) -> Result<(), RemoteError> {
        let mut st = self.begin(format!("remove {remote}"))?;
        match st.nodes.get(remote) {
            Some(Node::File(_)) => {
                st.nodes.remove(remote);
                Ok(())
            }
            Some(Node::Dir) => Err(RemoteError::Failure(format!("is a directory: {remote}"))),
            None => Err(RemoteError::NotFound(remote.into())),
        }
    }

    async fn remove_directory(&self, remote: &str) -> Result<(), RemoteError> {
        let mut st = self.begin(format!("rmdir {remote}"))?;
        match st.nodes.get(remote) {
            Some(Node::Dir) => {
                let child_prefix = format!("{remote}/");
                if st.nodes.keys().any(|k| k.starts_with(&child_prefix)) {
                    return Err(RemoteError::Failure(format!("not empty: {remote}")));
                }
                st.nodes.remove(remote);
                Ok(())
            }
            Some(Node::File(_)) => Err(RemoteError::Failure(format!("not a directory: {remote}"))),
            None => Err(RemoteError::NotFound(remote.into())),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), RemoteError> {
        let mut st = self.begin(format!("rename {from} {to}"))?;
        if st.fail_renames {
            return Err(RemoteError::Failure("rename refused".into()));
        }
        if !st.nodes.contains_key(from) {
            return Err(RemoteError::NotFound(from.into()));
        }
        if st.nodes.get(parent(to)) != Some(&Node::Dir) {
            return Err(RemoteError::NotFound(to.into()));
        }
        if st.nodes.contains_key(to) {
            return Err(RemoteError::Failure(format!("target exists: {to}")));
        }
        let child_prefix = format!("{from}/");
        let moved: Vec<String> = st
            .nodes
            .keys()
            .filter(|k| *k == from || k.starts_with(&child_prefix))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = st.nodes.remove(&key) {
                let new_key = format!("{to}{}", &key[from.len()..]);
                st.nodes.insert(new_key, node);
            }
        }
        Ok(())
    }

    async fn make_directory(&self, remote: &str) -> Result<(), RemoteError> {
        let mut st = self.begin(format!("mkdir {remote}"))?;
        if st.denied_mkdir.contains(remote) {
            return Err(RemoteError::Failure(format!("permission denied: {remote}")));
        }
        match st.nodes.get(remote) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(RemoteError::Failure(format!("file exists: {remote}"))),
            None if st.nodes.get(parent(remote)) != Some(&Node::Dir) => {
                Err(RemoteError::NotFound(remote.into()))
            }
            None => {
                st.nodes.insert(remote.into(), Node::Dir);
                Ok(())
            }
        }
    }

    async fn close(&self) -> Result<(), RemoteError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push("close".into());
        st.closed = true;
        Ok(())
    }
}
