//! Read-only registry of every type in a compilation unit.
//!
//! The index is built once per invocation over all files in the request,
//! dependencies included, since generated files may reference types that
//! live in imports. It is never mutated after construction.

use std::collections::HashMap;

use prost_types::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto};

/// A message descriptor together with its declaring file and package.
#[derive(Debug, Clone)]
pub struct IndexedMessage {
    /// The raw descriptor.
    pub descriptor: DescriptorProto,
    /// Declaring proto file.
    pub file: String,
    /// Package of the declaring file, possibly empty.
    pub package: String,
    /// Source location path of the declaration within its file.
    pub path: Vec<i32>,
}

/// An enum descriptor together with its declaring file and package.
#[derive(Debug, Clone)]
pub struct IndexedEnum {
    /// The raw descriptor.
    pub descriptor: EnumDescriptorProto,
    /// Declaring proto file.
    pub file: String,
    /// Package of the declaring file, possibly empty.
    pub package: String,
    /// Source location path of the declaration within its file.
    pub path: Vec<i32>,
}

// Field numbers used in source location paths.
const FILE_MESSAGE_TYPE: i32 = 4;
const FILE_ENUM_TYPE: i32 = 5;
const MESSAGE_NESTED_TYPE: i32 = 3;
const MESSAGE_ENUM_TYPE: i32 = 4;

/// Fully-qualified-name-keyed registry of messages, enums, and comments.
///
/// Keys are dot-prefixed fully qualified names, e.g. `.shop.Outer.Inner`.
#[derive(Debug, Default)]
pub struct DescriptorIndex {
    messages: HashMap<String, IndexedMessage>,
    enums: HashMap<String, IndexedEnum>,
    file_packages: HashMap<String, String>,
    comments: HashMap<String, HashMap<Vec<i32>, String>>,
}

impl DescriptorIndex {
    /// Builds the index over every file of a compilation unit.
    #[must_use]
    pub fn from_files(files: &[FileDescriptorProto]) -> Self {
        let mut index = Self::default();
        for file in files {
            index.index_file(file);
        }
        tracing::debug!(
            messages = index.messages.len(),
            enums = index.enums.len(),
            files = index.file_packages.len(),
            "descriptor index built"
        );
        index
    }

    /// Looks up a message descriptor by fully qualified name.
    #[must_use]
    pub fn resolve_message(&self, full_name: &str) -> Option<&IndexedMessage> {
        self.messages.get(full_name)
    }

    /// Looks up an enum descriptor by fully qualified name.
    #[must_use]
    pub fn resolve_enum(&self, full_name: &str) -> Option<&IndexedEnum> {
        self.enums.get(full_name)
    }

    /// Package declared by a file, if the file was indexed.
    #[must_use]
    pub fn package_of(&self, file: &str) -> Option<&str> {
        self.file_packages.get(file).map(String::as_str)
    }

    /// Documentation attached to a declaration path within a file.
    ///
    /// Absence is normal; most declarations carry no comments.
    #[must_use]
    pub fn comment(&self, file: &str, path: &[i32]) -> Option<&str> {
        self.comments
            .get(file)
            .and_then(|by_path| by_path.get(path))
            .map(String::as_str)
    }

    /// Number of indexed message types.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Number of indexed enum types.
    #[must_use]
    pub fn enum_count(&self) -> usize {
        self.enums.len()
    }

    fn index_file(&mut self, file: &FileDescriptorProto) {
        let file_name = file.name().to_string();
        let package = file.package().to_string();

        self.file_packages
            .insert(file_name.clone(), package.clone());
        self.extract_comments(file);

        self.index_messages(&file.message_type, &package, "", &file_name, &[FILE_MESSAGE_TYPE]);
        self.index_enums(&file.enum_type, &package, "", &file_name, &[FILE_ENUM_TYPE]);
    }

    fn index_messages(
        &mut self,
        messages: &[DescriptorProto],
        package: &str,
        parent: &str,
        file: &str,
        path_prefix: &[i32],
    ) {
        for (i, message) in messages.iter().enumerate() {
            let full_name = qualified_name(package, parent, message.name());
            let nested_parent = join_parent(parent, message.name());

            let mut path = path_prefix.to_vec();
            path.push(i32::try_from(i).unwrap_or(i32::MAX));

            let mut nested_prefix = path.clone();
            nested_prefix.push(MESSAGE_NESTED_TYPE);
            self.index_messages(&message.nested_type, package, &nested_parent, file, &nested_prefix);

            let mut enum_prefix = path.clone();
            enum_prefix.push(MESSAGE_ENUM_TYPE);
            self.index_enums(&message.enum_type, package, &nested_parent, file, &enum_prefix);

            tracing::trace!(%full_name, "indexed message type");
            self.messages.insert(
                full_name,
                IndexedMessage {
                    descriptor: message.clone(),
                    file: file.to_string(),
                    package: package.to_string(),
                    path,
                },
            );
        }
    }

    fn index_enums(
        &mut self,
        enums: &[EnumDescriptorProto],
        package: &str,
        parent: &str,
        file: &str,
        path_prefix: &[i32],
    ) {
        for (i, proto_enum) in enums.iter().enumerate() {
            let full_name = qualified_name(package, parent, proto_enum.name());
            let mut path = path_prefix.to_vec();
            path.push(i32::try_from(i).unwrap_or(i32::MAX));

            tracing::trace!(%full_name, "indexed enum type");
            self.enums.insert(
                full_name,
                IndexedEnum {
                    descriptor: proto_enum.clone(),
                    file: file.to_string(),
                    package: package.to_string(),
                    path,
                },
            );
        }
    }

    fn extract_comments(&mut self, file: &FileDescriptorProto) {
        let Some(info) = &file.source_code_info else {
            return;
        };

        let mut by_path = HashMap::new();
        for location in &info.location {
            let mut parts = Vec::new();
            if let Some(leading) = &location.leading_comments {
                let cleaned = clean_comment(leading);
                if !cleaned.is_empty() {
                    parts.push(cleaned);
                }
            }
            if let Some(trailing) = &location.trailing_comments {
                let cleaned = clean_comment(trailing);
                if !cleaned.is_empty() {
                    parts.push(cleaned);
                }
            }
            if !parts.is_empty() {
                by_path.insert(location.path.clone(), parts.join(" "));
            }
        }

        if !by_path.is_empty() {
            self.comments.insert(file.name().to_string(), by_path);
        }
    }
}

fn qualified_name(package: &str, parent: &str, name: &str) -> String {
    match (package.is_empty(), parent.is_empty()) {
        (true, true) => format!(".{name}"),
        (true, false) => format!(".{parent}.{name}"),
        (false, true) => format!(".{package}.{name}"),
        (false, false) => format!(".{package}.{parent}.{name}"),
    }
}

fn join_parent(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// Trims each comment line and collapses surrounding whitespace.
fn clean_comment(comment: &str) -> String {
    comment
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::source_code_info::Location;
    use prost_types::SourceCodeInfo;

    fn message(name: &str) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn file(name: &str, package: &str) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.to_string()),
            package: Some(package.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn indexes_top_level_and_nested_types() {
        let mut inner = message("Inner");
        inner.enum_type.push(EnumDescriptorProto {
            name: Some("Mode".to_string()),
            ..Default::default()
        });
        let mut outer = message("Outer");
        outer.nested_type.push(inner);

        let mut f = file("shop/orders.proto", "shop");
        f.message_type.push(outer);
        f.enum_type.push(EnumDescriptorProto {
            name: Some("Status".to_string()),
            ..Default::default()
        });

        let index = DescriptorIndex::from_files(&[f]);

        assert!(index.resolve_message(".shop.Outer").is_some());
        assert!(index.resolve_message(".shop.Outer.Inner").is_some());
        assert!(index.resolve_enum(".shop.Status").is_some());
        assert!(index.resolve_enum(".shop.Outer.Inner.Mode").is_some());
        assert_eq!(index.message_count(), 2);
        assert_eq!(index.enum_count(), 2);
        assert_eq!(index.package_of("shop/orders.proto"), Some("shop"));
    }

    #[test]
    fn indexes_without_package() {
        let mut f = file("plain.proto", "");
        f.message_type.push(message("Thing"));

        let index = DescriptorIndex::from_files(&[f]);
        assert!(index.resolve_message(".Thing").is_some());
    }

    #[test]
    fn unknown_type_resolves_to_none() {
        let index = DescriptorIndex::from_files(&[]);
        assert!(index.resolve_message(".missing.Type").is_none());
        assert!(index.resolve_enum(".missing.Enum").is_none());
    }

    #[test]
    fn indexes_dependency_files_too() {
        let mut dep = file("common.proto", "common");
        dep.message_type.push(message("Shared"));
        let main = file("main.proto", "app");

        let index = DescriptorIndex::from_files(&[dep, main]);
        assert!(index.resolve_message(".common.Shared").is_some());
    }

    #[test]
    fn records_declaring_file_and_package() {
        let mut f = file("shop/orders.proto", "shop");
        f.message_type.push(message("Order"));

        let index = DescriptorIndex::from_files(&[f]);
        let indexed = index.resolve_message(".shop.Order").unwrap();
        assert_eq!(indexed.file, "shop/orders.proto");
        assert_eq!(indexed.package, "shop");
        assert_eq!(indexed.path, vec![4, 0]);
    }

    #[test]
    fn records_nested_declaration_paths() {
        let mut inner = message("Inner");
        inner.enum_type.push(EnumDescriptorProto {
            name: Some("Mode".to_string()),
            ..Default::default()
        });
        let mut outer = message("Outer");
        outer.nested_type.push(inner);
        let mut f = file("shop/orders.proto", "shop");
        f.message_type.push(message("First"));
        f.message_type.push(outer);

        let index = DescriptorIndex::from_files(&[f]);
        assert_eq!(index.resolve_message(".shop.Outer").unwrap().path, vec![4, 1]);
        assert_eq!(
            index.resolve_message(".shop.Outer.Inner").unwrap().path,
            vec![4, 1, 3, 0]
        );
        assert_eq!(
            index.resolve_enum(".shop.Outer.Inner.Mode").unwrap().path,
            vec![4, 1, 3, 0, 4, 0]
        );
    }

    #[test]
    fn extracts_comments_by_path() {
        let mut f = file("svc.proto", "svc");
        f.source_code_info = Some(SourceCodeInfo {
            location: vec![
                Location {
                    path: vec![6, 0],
                    leading_comments: Some(" A service.\n".to_string()),
                    ..Default::default()
                },
                Location {
                    path: vec![6, 0, 2, 0],
                    leading_comments: Some("  Does a thing.\n".to_string()),
                    trailing_comments: Some(" Slowly.\n".to_string()),
                    ..Default::default()
                },
                Location {
                    path: vec![4, 0],
                    ..Default::default()
                },
            ],
        });

        let index = DescriptorIndex::from_files(&[f]);
        assert_eq!(index.comment("svc.proto", &[6, 0]), Some("A service."));
        assert_eq!(
            index.comment("svc.proto", &[6, 0, 2, 0]),
            Some("Does a thing. Slowly.")
        );
        assert_eq!(index.comment("svc.proto", &[4, 0]), None);
        assert_eq!(index.comment("other.proto", &[6, 0]), None);
    }

    #[test]
    fn multi_line_comments_keep_lines_trimmed() {
        assert_eq!(clean_comment(" first\n  second \n"), "first\nsecond");
        assert_eq!(clean_comment("   "), "");
    }
}
