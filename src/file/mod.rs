/*
 * Copyright 2024 ferrite contributors
 *
 * This file is part of ferrite.
 *
 * ferrite is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * ferrite is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * ferrite. If not, see <https://www.gnu.org/licenses/>.
 */

//! The in-memory filesystem: a tree of nodes, each identified by a stable [`NodeId`] rather than
//! the raw parent/first-child/next-sibling pointers an earlier design used. A directory simply
//! stores the ids of its children; path resolution walks ids instead of pointers, which avoids
//! the dangling-pointer hazards a pointer tree has during unlink.

pub mod disk;
pub mod fd;

use crate::errno::{KError, KResult};
use crate::kerr;
use crate::sync::IntMutex;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Index into the node arena. Stable for the lifetime of the node.
pub type NodeId = usize;

/// The id of the root directory, always present.
pub const ROOT: NodeId = 0;

/// Maximum length, in bytes, of a single path component's stored name.
pub const MAX_NAME: usize = 31;

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum FileKind {
	File,
	Dir,
}

/// A node in the file tree.
pub struct FileNode {
	pub kind: FileKind,
	pub name: String,
	pub data: Vec<u8>,
	pub parent: Option<NodeId>,
	pub children: Vec<NodeId>,
}

impl FileNode {
	fn new(kind: FileKind, name: &str, parent: Option<NodeId>) -> Self {
		Self {
			kind,
			name: truncate_name(name),
			data: Vec::new(),
			parent,
			children: Vec::new(),
		}
	}
}

/// Truncates `name` to [`MAX_NAME`] bytes on a UTF-8 char boundary.
fn truncate_name(name: &str) -> String {
	let mut end = name.len().min(MAX_NAME);
	while !name.is_char_boundary(end) {
		end -= 1;
	}
	name[..end].to_string()
}

struct Tree {
	nodes: Vec<Option<FileNode>>,
	free: Vec<NodeId>,
}

impl Tree {
	const fn new() -> Self {
		Self {
			nodes: Vec::new(),
			free: Vec::new(),
		}
	}

	fn alloc(&mut self, node: FileNode) -> NodeId {
		if let Some(id) = self.free.pop() {
			self.nodes[id] = Some(node);
			id
		} else {
			self.nodes.push(Some(node));
			self.nodes.len() - 1
		}
	}

	fn free_node(&mut self, id: NodeId) {
		self.nodes[id] = None;
		self.free.push(id);
	}

	fn get(&self, id: NodeId) -> &FileNode {
		self.nodes[id].as_ref().expect("dangling file node id")
	}

	fn get_mut(&mut self, id: NodeId) -> &mut FileNode {
		self.nodes[id].as_mut().expect("dangling file node id")
	}
}

static TREE: IntMutex<Tree> = IntMutex::new(Tree::new());

/// Creates the root directory. Must be called exactly once, before any other function in this
/// module, and before [`crate::memory::heap::init`] has allocated anything else that assumes an
/// empty arena.
pub fn init() {
	let mut tree = TREE.lock();
	let id = tree.alloc(FileNode::new(FileKind::Dir, "", None));
	debug_assert_eq!(id, ROOT);
}

/// Resolves `path` to a node id, starting at `cwd` for relative paths and at [`ROOT`] for paths
/// beginning with `/`.
///
/// `.` is a no-op, `..` follows the parent link (a no-op at the root). Each component is
/// truncated to [`MAX_NAME`] bytes for comparison, matching how names are stored.
pub fn resolve(cwd: NodeId, path: &str) -> KResult<NodeId> {
	let tree = TREE.lock();
	let mut cur = if path.starts_with('/') { ROOT } else { cwd };
	for raw_comp in path.split('/').filter(|c| !c.is_empty()) {
		let comp = truncate_name(raw_comp);
		match comp.as_str() {
			"." => {}
			".." => {
				cur = tree.get(cur).parent.unwrap_or(ROOT);
			}
			name => {
				let node = tree.get(cur);
				if node.kind != FileKind::Dir {
					return Err(kerr!(NotADirectory));
				}
				cur = node
					.children
					.iter()
					.copied()
					.find(|&id| tree.get(id).name == name)
					.ok_or(kerr!(NotFound))?;
			}
		}
	}
	Ok(cur)
}

/// Splits `path` into the resolved parent directory and the final component's name.
fn split_parent<'p>(cwd: NodeId, path: &'p str) -> KResult<(NodeId, &'p str)> {
	let (dir_part, name) = path.rsplit_once('/').unwrap_or((".", path));
	if name.is_empty() || name == "." || name == ".." {
		return Err(kerr!(InvalidArgument));
	}
	let dir_part = if dir_part.is_empty() { "/" } else { dir_part };
	let dir = resolve(cwd, dir_part)?;
	Ok((dir, name))
}

fn create(cwd: NodeId, path: &str, kind: FileKind) -> KResult<NodeId> {
	let (dir, name) = split_parent(cwd, path)?;
	let mut tree = TREE.lock();
	if tree.get(dir).kind != FileKind::Dir {
		return Err(kerr!(NotADirectory));
	}
	let truncated = truncate_name(name);
	if tree.get(dir).children.iter().any(|&id| tree.get(id).name == truncated) {
		return Err(kerr!(AlreadyExists));
	}
	let id = tree.alloc(FileNode::new(kind, name, Some(dir)));
	tree.get_mut(dir).children.push(id);
	Ok(id)
}

/// Creates a directory at `path`, relative to `cwd`.
pub fn mkdir(cwd: NodeId, path: &str) -> KResult<NodeId> {
	create(cwd, path, FileKind::Dir)
}

/// Creates an empty file at `path`, relative to `cwd`.
pub fn touch(cwd: NodeId, path: &str) -> KResult<NodeId> {
	create(cwd, path, FileKind::File)
}

/// Returns the ids of the children of directory `dir`, in creation order.
pub fn list(dir: NodeId) -> KResult<Vec<NodeId>> {
	let tree = TREE.lock();
	if tree.get(dir).kind != FileKind::Dir {
		return Err(kerr!(NotADirectory));
	}
	Ok(tree.get(dir).children.clone())
}

/// Returns the name of node `id`.
pub fn name_of(id: NodeId) -> String {
	TREE.lock().get(id).name.clone()
}

/// Returns the kind of node `id`.
pub fn kind_of(id: NodeId) -> FileKind {
	TREE.lock().get(id).kind
}

/// Returns the parent of node `id`, or `None` if it is [`ROOT`].
pub fn parent_of(id: NodeId) -> Option<NodeId> {
	TREE.lock().get(id).parent
}

/// Builds the full slash-joined path from [`ROOT`] to `id`.
pub fn path_of(id: NodeId) -> String {
	if id == ROOT {
		return "/".to_string();
	}
	let mut components = Vec::new();
	let mut cur = id;
	loop {
		components.push(name_of(cur));
		match parent_of(cur) {
			Some(p) if p != cur => cur = p,
			_ => break,
		}
		if cur == ROOT {
			break;
		}
	}
	let mut path = String::new();
	for comp in components.iter().rev() {
		path.push('/');
		path.push_str(comp);
	}
	path
}

/// Returns the current size, in bytes, of file `id`.
pub fn size_of(id: NodeId) -> usize {
	TREE.lock().get(id).data.len()
}

/// Replaces the data of file `id` with a fresh copy of `content`.
pub fn write(id: NodeId, content: &[u8]) -> KResult<()> {
	let mut tree = TREE.lock();
	let node = tree.get_mut(id);
	if node.kind != FileKind::File {
		return Err(kerr!(NotADirectory));
	}
	node.data = content.to_vec();
	Ok(())
}

/// Returns a copy of the full contents of file `id`.
pub fn contents(id: NodeId) -> KResult<Vec<u8>> {
	let tree = TREE.lock();
	let node = tree.get(id);
	if node.kind != FileKind::File {
		return Err(kerr!(NotADirectory));
	}
	Ok(node.data.clone())
}

/// Copies up to `buf.len()` bytes from file `id` starting at `offset`, returning the number of
/// bytes actually copied (`0` at end-of-file).
pub fn read_at(id: NodeId, offset: usize, buf: &mut [u8]) -> KResult<usize> {
	let tree = TREE.lock();
	let node = tree.get(id);
	if node.kind != FileKind::File {
		return Err(kerr!(NotADirectory));
	}
	if offset >= node.data.len() {
		return Ok(0);
	}
	let n = buf.len().min(node.data.len() - offset);
	buf[..n].copy_from_slice(&node.data[offset..offset + n]);
	Ok(n)
}

/// Writes `data` into file `id` at `offset`, extending it if `offset + data.len()` exceeds its
/// current size.
pub fn write_at(id: NodeId, offset: usize, data: &[u8]) -> KResult<()> {
	let mut tree = TREE.lock();
	let node = tree.get_mut(id);
	if node.kind != FileKind::File {
		return Err(kerr!(NotADirectory));
	}
	let end = offset + data.len();
	if end > node.data.len() {
		node.data.resize(end, 0);
	}
	node.data[offset..end].copy_from_slice(data);
	Ok(())
}

/// Deletes the entry named `path` from `cwd`. Fails if it is a non-empty directory.
pub fn delete(cwd: NodeId, path: &str) -> KResult<()> {
	let (dir, name) = split_parent(cwd, path)?;
	let mut tree = TREE.lock();
	let truncated = truncate_name(name);
	let id = tree
		.get(dir)
		.children
		.iter()
		.copied()
		.find(|&id| tree.get(id).name == truncated)
		.ok_or(kerr!(NotFound))?;
	if tree.get(id).kind == FileKind::Dir && !tree.get(id).children.is_empty() {
		return Err(kerr!(NotEmpty));
	}
	tree.get_mut(dir).children.retain(|&c| c != id);
	tree.free_node(id);
	Ok(())
}

/// Creates a file directly under the root, for Multiboot modules loaded before the on-disk
/// filesystem. Unlike [`touch`], the name is taken verbatim and may itself be a flattened path.
pub fn create_root_file(name: &str, data: Vec<u8>) -> NodeId {
	let mut tree = TREE.lock();
	let mut node = FileNode::new(FileKind::File, name, Some(ROOT));
	node.data = data;
	let id = tree.alloc(node);
	tree.get_mut(ROOT).children.push(id);
	id
}

/// Creates the root directory exactly once, so every module's `#[test_case]`s can rely on it
/// existing regardless of run order, the same way [`crate::memory::test_init`] does for memory.
#[cfg(test)]
pub(crate) fn test_init() {
	static DONE: IntMutex<bool> = IntMutex::new(false);
	let mut done = DONE.lock();
	if !*done {
		init();
		*done = true;
	}
}

#[cfg(test)]
mod test {
	use super::*;

	/// P3: resolving the same path twice, with no writes in between, is idempotent.
	#[test_case]
	fn resolve_idempotent() {
		test_init();
		mkdir(ROOT, "idempotent_dir").unwrap();
		let a = resolve(ROOT, "idempotent_dir").unwrap();
		let b = resolve(ROOT, "idempotent_dir").unwrap();
		assert_eq!(a, b);
	}

	/// P4: reads after writes return exactly what was last written.
	#[test_case]
	fn write_then_read() {
		test_init();
		let f = touch(ROOT, "write_then_read.txt").unwrap();
		write(f, b"hello").unwrap();
		let mut buf = [0u8; 5];
		let n = read_at(f, 0, &mut buf).unwrap();
		assert_eq!(&buf[..n], b"hello");
	}

	#[test_case]
	fn delete_rejects_nonempty_dir() {
		test_init();
		mkdir(ROOT, "nonempty").unwrap();
		touch(ROOT, "nonempty/child").unwrap();
		assert!(matches!(delete(ROOT, "nonempty"), Err(KError::NotEmpty)));
	}

	#[test_case]
	fn dotdot_at_root_is_noop() {
		test_init();
		let a = resolve(ROOT, "..").unwrap();
		assert_eq!(a, ROOT);
	}
}
