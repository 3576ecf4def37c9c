//! Directory-tree enumeration and action-output flattening.

use crate::error::{Error, Result};
use crate::Client;
use futures::StreamExt;
use porter_core::Digest;
use porter_rpc::messages::{ActionResult, Directory, GetTreeRequest, Tree};
use porter_rpc::{encode, RpcError};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One entry of a flattened action output, keyed by path in the result map.
#[derive(Clone, Debug, PartialEq)]
pub enum Output {
    /// A regular file stored in the CAS.
    File {
        digest: Digest,
        is_executable: bool,
    },
    /// A symlink to a file or directory.
    Symlink { target: String },
}

impl Client {
    /// Fetch the entire directory tree rooted at the given digest.
    ///
    /// Pages are accumulated across the GetTree stream. The whole paginated
    /// walk is one retry unit: the page token advances only after a page is
    /// consumed, so a retry resumes from the page that failed rather than
    /// from the beginning.
    pub async fn get_directory_tree(
        &self,
        cancel: &CancellationToken,
        root: &Digest,
    ) -> Result<Vec<Directory>> {
        let state: Mutex<(String, Vec<Directory>)> = Mutex::new((String::new(), Vec::new()));
        let state_ref = &state;
        let this = self;
        let root = *root;

        self.retrier
            .run(cancel, move || async move {
                let page_token = state_ref.lock().await.0.clone();
                let request = GetTreeRequest {
                    instance_name: this.config.instance_name.clone(),
                    root_digest: root,
                    page_token,
                };
                let mut pages = this.cas.get_tree(request);
                while let Some(page) = pages.next().await {
                    if cancel.is_cancelled() {
                        return Err(RpcError::Cancelled);
                    }
                    let page = page?;
                    let mut guard = state_ref.lock().await;
                    guard.0 = page.next_page_token.clone();
                    guard.1.extend(page.directories);
                }
                Ok(())
            })
            .await?;

        Ok(state.into_inner().1)
    }

    /// Collect and flatten all the outputs of an action into a path-keyed
    /// map.
    ///
    /// Output directories are expanded by fetching their Tree blobs; a Tree
    /// blob that cannot be read is skipped and its directory is simply
    /// absent from the result.
    pub async fn flatten_action_outputs(
        &self,
        cancel: &CancellationToken,
        result: &ActionResult,
    ) -> Result<HashMap<String, Output>> {
        let mut outs = HashMap::new();
        for file in &result.output_files {
            outs.insert(
                file.path.clone(),
                Output::File {
                    digest: file.digest,
                    is_executable: file.is_executable,
                },
            );
        }
        for link in &result.output_file_symlinks {
            outs.insert(
                link.path.clone(),
                Output::Symlink {
                    target: link.target.clone(),
                },
            );
        }
        for link in &result.output_directory_symlinks {
            outs.insert(
                link.path.clone(),
                Output::Symlink {
                    target: link.target.clone(),
                },
            );
        }
        for dir in &result.output_directories {
            match self.read_blob(cancel, &dir.tree_digest).await {
                Ok(blob) => {
                    let tree: Tree = porter_rpc::decode(&blob)?;
                    outs.extend(flatten_tree(&tree, &dir.path)?);
                }
                Err(err) => {
                    tracing::debug!(
                        path = %dir.path,
                        digest = %dir.tree_digest,
                        error = %err,
                        "skipping unreadable tree blob"
                    );
                }
            }
        }
        Ok(outs)
    }
}

/// Flatten a Tree into a path-keyed output map, prefixing every path with
/// `prefix`.
pub fn flatten_tree(tree: &Tree, prefix: &str) -> Result<HashMap<String, Output>> {
    let mut children: HashMap<Digest, &Directory> = HashMap::new();
    for child in &tree.children {
        children.insert(Digest::of_blob(&encode(child)?), child);
    }

    let mut outs = HashMap::new();
    let mut stack: Vec<(String, &Directory)> = vec![(prefix.to_string(), &tree.root)];
    while let Some((base, dir)) = stack.pop() {
        for file in &dir.files {
            outs.insert(
                join_path(&base, &file.name),
                Output::File {
                    digest: file.digest,
                    is_executable: file.is_executable,
                },
            );
        }
        for link in &dir.symlinks {
            outs.insert(
                join_path(&base, &link.name),
                Output::Symlink {
                    target: link.target.clone(),
                },
            );
        }
        for node in &dir.directories {
            match children.get(&node.digest) {
                Some(child) => stack.push((join_path(&base, &node.name), child)),
                None => {
                    return Err(Error::InvalidArgument(format!(
                        "tree is missing child directory {} ({})",
                        node.name, node.digest
                    )))
                }
            }
        }
    }
    Ok(outs)
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}
