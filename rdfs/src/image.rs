use crate::{error::*, types::*};

/// A ramdisk image held in memory.
#[derive(Clone, Copy, Debug)]
pub struct Image<'a> {
    root: Directory<'a>,
}
impl<'a> Image<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        Ok(Image {
            root: Directory::parse(b"", bytes, 0)?,
        })
    }

    pub fn root(&self) -> Directory<'a> { self.root }

    pub fn len(&self) -> usize { self.root.len() }

    pub fn is_empty(&self) -> bool { self.root.entries().next().is_none() }

    /// Resolve a slash separated path from the root.
    /// Empty components are ignored, so `""` and `"/"` name the root.
    pub fn lookup(&self, path: &str) -> Result<Node<'a>> {
        let mut node = Node::Directory(self.root);
        for component in path.split('/').filter(|c| !c.is_empty()) {
            let directory = match node {
                Node::Directory(directory) => directory,
                Node::File(_) => {
                    return Err(Error::NotADirectory {
                        path: path.to_string(),
                    })
                }
            };
            node = directory
                .find(component.as_bytes())?
                .ok_or_else(|| Error::NotFound {
                    path: path.to_string(),
                })?;
        }
        Ok(node)
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Node<'a> {
    File(File<'a>),
    Directory(Directory<'a>),
}
impl<'a> Node<'a> {
    pub fn name(&self) -> &'a [u8] {
        match self {
            Node::File(file) => file.name,
            Node::Directory(directory) => directory.name,
        }
    }

    /// Serialized length, equal to the length recorded in the parent header.
    pub fn len(&self) -> usize {
        match self {
            Node::File(file) => file.len(),
            Node::Directory(directory) => directory.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Position of the node's bytes in the image.
    pub fn offset(&self) -> usize {
        match self {
            Node::File(file) => file.offset,
            Node::Directory(directory) => directory.offset,
        }
    }

    pub fn is_dir(&self) -> bool { matches!(self, Node::Directory(_)) }
}

#[derive(Clone, Copy, Debug)]
pub struct File<'a> {
    name:   &'a [u8],
    data:   &'a [u8],
    offset: usize,
}
impl<'a> File<'a> {
    pub fn name(&self) -> &'a [u8] { self.name }

    pub fn data(&self) -> &'a [u8] { self.data }

    pub fn offset(&self) -> usize { self.offset }

    pub fn len(&self) -> usize { self.data.len() }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }
}

#[derive(Clone, Copy, Debug)]
pub struct Directory<'a> {
    name:     &'a [u8],
    header:   &'a DirectoryHeader,
    children: &'a [u8],
    offset:   usize,
}
impl<'a> Directory<'a> {
    fn parse(name: &'a [u8], region: &'a [u8], offset: usize) -> Result<Self> {
        let (header, children) =
            DirectoryHeader::ref_from_prefix(region).map_err(|_| Error::Truncated {
                offset,
                length: HEADER_SIZE,
                available: region.len(),
            })?;
        Ok(Directory {
            name,
            header,
            children,
            offset,
        })
    }

    pub fn name(&self) -> &'a [u8] { self.name }

    pub fn header(&self) -> &'a DirectoryHeader { self.header }

    pub fn offset(&self) -> usize { self.offset }

    /// Header plus all children.
    pub fn len(&self) -> usize { HEADER_SIZE + self.children.len() }

    pub fn is_empty(&self) -> bool { false }

    pub fn entries(&self) -> Entries<'a> {
        Entries {
            directory: *self,
            index:     0,
            position:  0,
            done:      false,
        }
    }

    /// Linear scan over the header, stopping at the first empty slot.
    pub fn find(&self, name: &[u8]) -> Result<Option<Node<'a>>> {
        for node in self.entries() {
            let node = node?;
            if node.name() == name {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Depth first walk over every node below this directory, parents
    /// before their children. Nesting is tracked on the heap, so arbitrarily
    /// deep images are walked without recursion.
    pub fn walk(&self) -> Walk<'a> {
        Walk {
            stack: vec![self.entries()],
        }
    }

    /// Check that the children of this directory and of every directory
    /// below it fill their regions exactly. Returns the number of nodes
    /// below this directory.
    pub fn verify(&self) -> Result<usize> {
        self.check_span()?;
        let mut count = 0;
        for item in self.walk() {
            let (_, node) = item?;
            if let Node::Directory(directory) = node {
                directory.check_span()?;
            }
            count += 1;
        }
        Ok(count)
    }

    fn check_span(&self) -> Result<()> {
        let mut covered = 0;
        for node in self.entries() {
            covered += node?.len();
        }
        if covered != self.children.len() {
            return Err(Error::Inconsistent {
                offset:   self.offset,
                expected: self.children.len(),
                actual:   covered,
            });
        }
        Ok(())
    }
}

/// Iterator over the used slots of a directory header.
/// Stops after the first error.
pub struct Entries<'a> {
    directory: Directory<'a>,
    index:     usize,
    position:  usize,
    done:      bool,
}
impl<'a> Iterator for Entries<'a> {
    type Item = Result<Node<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.index >= DIR_ENTRIES {
            return None;
        }
        let header = self.directory.header;
        let entry = &header.entries[self.index];
        if entry.is_empty() {
            self.done = true;
            return None;
        }
        let entry_offset = self.directory.offset + self.index * ENTRY_SIZE;
        self.index += 1;

        let children = self.directory.children;
        let start = self.position;
        let length = entry.length() as usize;
        let offset = self.directory.offset + HEADER_SIZE + start;
        let end = match start.checked_add(length) {
            Some(end) if end <= children.len() => end,
            _ => {
                self.done = true;
                return Some(Err(Error::Truncated {
                    offset,
                    length,
                    available: children.len() - start,
                }));
            }
        };
        self.position = end;

        let name = entry.name();
        let region = &children[start..end];
        let node = match entry.flag {
            FLAG_FILE => Ok(Node::File(File {
                name,
                data: region,
                offset,
            })),
            FLAG_DIRECTORY => Directory::parse(name, region, offset).map(Node::Directory),
            flag => Err(Error::InvalidFlag {
                offset: entry_offset + NAME_SIZE + 4,
                flag,
            }),
        };
        if node.is_err() {
            self.done = true;
        }
        Some(node)
    }
}

/// Iterator returned by [`Directory::walk`], yielding each node with its
/// nesting level (0 for direct children). Stops after the first error.
pub struct Walk<'a> {
    stack: Vec<Entries<'a>>,
}
impl<'a> Iterator for Walk<'a> {
    type Item = Result<(usize, Node<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let depth = self.stack.len().checked_sub(1)?;
            let entries = self.stack.last_mut()?;
            match entries.next() {
                None => {
                    self.stack.pop();
                }
                Some(Err(e)) => {
                    self.stack.clear();
                    return Some(Err(e));
                }
                Some(Ok(node)) => {
                    if let Node::Directory(directory) = node {
                        self.stack.push(directory.entries());
                    }
                    return Some(Ok((depth, node)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use zerocopy::byteorder::little_endian::U32;

    use super::*;

    fn entry(name: &str, length: usize, flag: u8) -> DirectoryEntry {
        let mut entry = DirectoryEntry::new_zeroed();
        entry.name[0..name.len()].copy_from_slice(name.as_bytes());
        entry.length = U32::new(length as u32);
        entry.flag = flag;
        entry
    }

    fn directory(children: &[(&str, Vec<u8>, u8)]) -> Vec<u8> {
        let mut header = DirectoryHeader::new_zeroed();
        for (i, (name, data, flag)) in children.iter().enumerate() {
            header.entries[i] = entry(name, data.len(), *flag);
        }
        let mut bytes = header.as_bytes().to_vec();
        for (_, data, _) in children {
            bytes.extend_from_slice(data);
        }
        bytes
    }

    fn sample() -> Vec<u8> {
        let sub = directory(&[("b", b"Z".to_vec(), FLAG_FILE)]);
        directory(&[
            ("a.txt", b"xyz".to_vec(), FLAG_FILE),
            ("sub", sub, FLAG_DIRECTORY),
        ])
    }

    #[test]
    fn lookup_resolves_nested_paths() {
        let bytes = sample();
        let image = Image::new(&bytes).unwrap();
        assert_eq!(image.len(), 4260);

        match image.lookup("a.txt").unwrap() {
            Node::File(file) => {
                assert_eq!(file.data(), b"xyz");
                assert_eq!(file.offset(), HEADER_SIZE);
            }
            Node::Directory(_) => panic!("expected a file"),
        }
        match image.lookup("/sub/b").unwrap() {
            Node::File(file) => {
                assert_eq!(file.data(), b"Z");
                assert_eq!(file.offset(), HEADER_SIZE + 3 + HEADER_SIZE);
            }
            Node::Directory(_) => panic!("expected a file"),
        }
        let sub = image.lookup("sub").unwrap();
        assert!(sub.is_dir());
        assert_eq!(sub.len(), 2129);
        assert!(image.lookup("").unwrap().is_dir());
    }

    #[test]
    fn lookup_reports_missing_and_non_directories() {
        let bytes = sample();
        let image = Image::new(&bytes).unwrap();
        assert_eq!(
            image.lookup("sub/missing").unwrap_err(),
            Error::NotFound {
                path: "sub/missing".to_string(),
            }
        );
        assert_eq!(
            image.lookup("a.txt/b").unwrap_err(),
            Error::NotADirectory {
                path: "a.txt/b".to_string(),
            }
        );
    }

    #[test]
    fn entries_stop_at_first_empty_slot() {
        let mut bytes = sample();
        // a name in the slot after the gap must not be reached
        let stray = entry("stray", 0, FLAG_FILE);
        let slot = 3 * ENTRY_SIZE;
        bytes[slot..slot + ENTRY_SIZE].copy_from_slice(stray.as_bytes());
        let image = Image::new(&bytes).unwrap();
        let names = image
            .root()
            .entries()
            .map(|node| node.unwrap().name().to_vec())
            .collect::<Vec<_>>();
        assert_eq!(names, vec![b"a.txt".to_vec(), b"sub".to_vec()]);
    }

    #[test]
    fn verify_counts_nodes() {
        let bytes = sample();
        let image = Image::new(&bytes).unwrap();
        assert_eq!(image.root().verify().unwrap(), 3);
        assert!(!image.is_empty());
    }

    #[test]
    fn walk_visits_parents_before_children() {
        let bytes = sample();
        let image = Image::new(&bytes).unwrap();
        let nodes = image
            .root()
            .walk()
            .map(|item| {
                let (depth, node) = item.unwrap();
                (depth, node.name().to_vec())
            })
            .collect::<Vec<_>>();
        assert_eq!(
            nodes,
            vec![
                (0, b"a.txt".to_vec()),
                (0, b"sub".to_vec()),
                (1, b"b".to_vec()),
            ]
        );
    }

    /// A chain of `levels` directories, each holding only the next one.
    fn chain(levels: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(levels * HEADER_SIZE);
        for level in 0..levels {
            let mut header = DirectoryHeader::new_zeroed();
            if level + 1 < levels {
                header.entries[0] = entry("d", (levels - level - 1) * HEADER_SIZE, FLAG_DIRECTORY);
            }
            bytes.extend_from_slice(header.as_bytes());
        }
        bytes
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let levels = 20_000;
        let bytes = chain(levels);
        let image = Image::new(&bytes).unwrap();
        assert_eq!(image.root().verify().unwrap(), levels - 1);

        let (depth, node) = image.root().walk().last().unwrap().unwrap();
        assert_eq!(depth, levels - 2);
        assert_eq!(node.offset(), (levels - 1) * HEADER_SIZE);
    }

    #[test]
    fn deep_nesting_reports_errors_at_the_bottom() {
        let levels = 20_000;
        let mut bytes = chain(levels);
        let last = (levels - 1) * HEADER_SIZE;
        bytes[last..last + ENTRY_SIZE].copy_from_slice(entry("f", 1, FLAG_FILE).as_bytes());
        let image = Image::new(&bytes).unwrap();
        assert_eq!(
            image.root().verify().unwrap_err(),
            Error::Truncated {
                offset:    last + HEADER_SIZE,
                length:    1,
                available: 0,
            }
        );
    }

    #[test]
    fn empty_directory_is_a_bare_header() {
        let bytes = directory(&[]);
        let image = Image::new(&bytes).unwrap();
        assert!(image.is_empty());
        assert_eq!(image.root().verify().unwrap(), 0);
    }

    #[test]
    fn short_buffer_is_truncated() {
        let bytes = vec![0; HEADER_SIZE - 1];
        assert_eq!(
            Image::new(&bytes).unwrap_err(),
            Error::Truncated {
                offset:    0,
                length:    HEADER_SIZE,
                available: HEADER_SIZE - 1,
            }
        );
    }

    #[test]
    fn entry_past_end_is_truncated() {
        let mut bytes = sample();
        bytes.truncate(bytes.len() - 1);
        let image = Image::new(&bytes).unwrap();
        let err = image.lookup("sub").unwrap_err();
        assert_eq!(
            err,
            Error::Truncated {
                offset:    HEADER_SIZE + 3,
                length:    2129,
                available: 2128,
            }
        );
    }

    #[test]
    fn invalid_flag_is_rejected() {
        let mut bytes = sample();
        bytes[NAME_SIZE + 4] = 7;
        let image = Image::new(&bytes).unwrap();
        assert_eq!(
            image.lookup("a.txt").unwrap_err(),
            Error::InvalidFlag {
                offset: NAME_SIZE + 4,
                flag:   7,
            }
        );
    }

    #[test]
    fn trailing_bytes_are_inconsistent() {
        let mut bytes = sample();
        bytes.push(0);
        let image = Image::new(&bytes).unwrap();
        assert_eq!(
            image.root().verify().unwrap_err(),
            Error::Inconsistent {
                offset:   0,
                expected: 3 + 2129 + 1,
                actual:   3 + 2129,
            }
        );
    }
}
