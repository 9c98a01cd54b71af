//! The closed set of operations in the file-entity capability contract.
//!
//! Every method a [`FileEntity`](crate::FileEntity) exposes has exactly one
//! [`FileOperation`] variant. The enum is used for three things:
//!
//! - capability introspection ([`EntityCore::supports`](crate::EntityCore::supports)),
//! - the operation id carried by [`FileError::Unsupported`](crate::FileError::Unsupported),
//! - exhaustive checks over the whole contract (see `tests/proxy.rs`).

use std::fmt;

/// One operation of the file-entity contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileOperation {
    // Attributes
    /// Existence check.
    Exists,
    /// Directory type query.
    IsDirectory,
    /// Symbolic link type query.
    IsSymlink,
    /// Hidden flag query.
    IsHidden,
    /// System flag query.
    IsSystem,
    /// Size query.
    Size,
    /// Modification date query.
    Date,
    /// Modification date mutator.
    ChangeDate,
    /// Permission bits query.
    Permissions,
    /// Changeable-permissions mask query.
    ChangeablePermissions,
    /// Permission bits mutator.
    ChangePermissions,
    /// Owner query.
    Owner,
    /// Group query.
    Group,
    /// Owner supportability query.
    CanGetOwner,
    /// Group supportability query.
    CanGetGroup,

    // Navigation
    /// Parent lookup.
    Parent,
    /// Parent override.
    SetParent,
    /// Root lookup.
    Root,
    /// Root check.
    IsRoot,
    /// Volume lookup.
    Volume,

    // Content
    /// Sequential read stream.
    ReadFile,
    /// Truncating write stream.
    WriteFile,
    /// Appending write stream.
    AppendFile,
    /// Random-access read stream.
    RandomReadFile,
    /// Random-access write stream.
    RandomWriteFile,

    // Mutation
    /// Directory creation.
    CreateDirectory,
    /// Deletion.
    Delete,
    /// Rename / move.
    Rename,
    /// Server-side copy.
    CopyRemotely,

    // Listing
    /// Unfiltered child listing.
    ListChildren,
    /// Filtered child listing.
    ListChildrenFiltered,

    // Space
    /// Free space query.
    FreeSpace,
    /// Total space query.
    TotalSpace,
}

impl FileOperation {
    /// Every operation, in declaration order.
    pub const ALL: [FileOperation; 33] = [
        FileOperation::Exists,
        FileOperation::IsDirectory,
        FileOperation::IsSymlink,
        FileOperation::IsHidden,
        FileOperation::IsSystem,
        FileOperation::Size,
        FileOperation::Date,
        FileOperation::ChangeDate,
        FileOperation::Permissions,
        FileOperation::ChangeablePermissions,
        FileOperation::ChangePermissions,
        FileOperation::Owner,
        FileOperation::Group,
        FileOperation::CanGetOwner,
        FileOperation::CanGetGroup,
        FileOperation::Parent,
        FileOperation::SetParent,
        FileOperation::Root,
        FileOperation::IsRoot,
        FileOperation::Volume,
        FileOperation::ReadFile,
        FileOperation::WriteFile,
        FileOperation::AppendFile,
        FileOperation::RandomReadFile,
        FileOperation::RandomWriteFile,
        FileOperation::CreateDirectory,
        FileOperation::Delete,
        FileOperation::Rename,
        FileOperation::CopyRemotely,
        FileOperation::ListChildren,
        FileOperation::ListChildrenFiltered,
        FileOperation::FreeSpace,
        FileOperation::TotalSpace,
    ];

    /// Stable identifier used in error messages and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            FileOperation::Exists => "exists",
            FileOperation::IsDirectory => "is_directory",
            FileOperation::IsSymlink => "is_symlink",
            FileOperation::IsHidden => "is_hidden",
            FileOperation::IsSystem => "is_system",
            FileOperation::Size => "size",
            FileOperation::Date => "date",
            FileOperation::ChangeDate => "change_date",
            FileOperation::Permissions => "permissions",
            FileOperation::ChangeablePermissions => "changeable_permissions",
            FileOperation::ChangePermissions => "change_permissions",
            FileOperation::Owner => "owner",
            FileOperation::Group => "group",
            FileOperation::CanGetOwner => "can_get_owner",
            FileOperation::CanGetGroup => "can_get_group",
            FileOperation::Parent => "parent",
            FileOperation::SetParent => "set_parent",
            FileOperation::Root => "root",
            FileOperation::IsRoot => "is_root",
            FileOperation::Volume => "volume",
            FileOperation::ReadFile => "read_file",
            FileOperation::WriteFile => "write_file",
            FileOperation::AppendFile => "append_file",
            FileOperation::RandomReadFile => "random_read_file",
            FileOperation::RandomWriteFile => "random_write_file",
            FileOperation::CreateDirectory => "create_directory",
            FileOperation::Delete => "delete",
            FileOperation::Rename => "rename",
            FileOperation::CopyRemotely => "copy_remotely",
            FileOperation::ListChildren => "list_children",
            FileOperation::ListChildrenFiltered => "list_children_filtered",
            FileOperation::FreeSpace => "free_space",
            FileOperation::TotalSpace => "total_space",
        }
    }

    /// Returns `true` for operations a backend may decline.
    ///
    /// Getters and navigation are always answerable (possibly with an
    /// "unknown" value); content, mutation, listing and space queries are
    /// not.
    pub const fn is_optional(self) -> bool {
        matches!(
            self,
            FileOperation::ChangeDate
                | FileOperation::ChangePermissions
                | FileOperation::ReadFile
                | FileOperation::WriteFile
                | FileOperation::AppendFile
                | FileOperation::RandomReadFile
                | FileOperation::RandomWriteFile
                | FileOperation::CreateDirectory
                | FileOperation::Delete
                | FileOperation::Rename
                | FileOperation::CopyRemotely
                | FileOperation::ListChildren
                | FileOperation::ListChildrenFiltered
                | FileOperation::FreeSpace
                | FileOperation::TotalSpace
        )
    }
}

/// Groups of operations, matching the component traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperationCategory {
    /// Existence, type flags, size, date, permissions, owner/group.
    Attributes,
    /// Parent, root, volume.
    Navigation,
    /// Streams.
    Content,
    /// mkdir, delete, rename, remote copy.
    Mutation,
    /// Child listing.
    Listing,
    /// Free/total space.
    Space,
}

impl FileOperation {
    /// The component trait this operation belongs to.
    pub const fn category(self) -> OperationCategory {
        use FileOperation::*;
        match self {
            Exists | IsDirectory | IsSymlink | IsHidden | IsSystem | Size | Date | ChangeDate
            | Permissions | ChangeablePermissions | ChangePermissions | Owner | Group
            | CanGetOwner | CanGetGroup => OperationCategory::Attributes,
            Parent | SetParent | Root | IsRoot | Volume => OperationCategory::Navigation,
            ReadFile | WriteFile | AppendFile | RandomReadFile | RandomWriteFile => {
                OperationCategory::Content
            }
            CreateDirectory | Delete | Rename | CopyRemotely => OperationCategory::Mutation,
            ListChildren | ListChildrenFiltered => OperationCategory::Listing,
            FreeSpace | TotalSpace => OperationCategory::Space,
        }
    }
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_has_no_duplicates() {
        let set: HashSet<_> = FileOperation::ALL.iter().copied().collect();
        assert_eq!(set.len(), FileOperation::ALL.len());
    }

    #[test]
    fn identifiers_are_unique() {
        let set: HashSet<_> = FileOperation::ALL.iter().map(|op| op.as_str()).collect();
        assert_eq!(set.len(), FileOperation::ALL.len());
    }

    #[test]
    fn getters_are_not_optional() {
        assert!(!FileOperation::Size.is_optional());
        assert!(!FileOperation::Parent.is_optional());
        assert!(FileOperation::Delete.is_optional());
        assert!(FileOperation::FreeSpace.is_optional());
    }

    #[test]
    fn categories_follow_component_traits() {
        assert_eq!(FileOperation::Owner.category(), OperationCategory::Attributes);
        assert_eq!(FileOperation::Volume.category(), OperationCategory::Navigation);
        assert_eq!(FileOperation::AppendFile.category(), OperationCategory::Content);
        assert_eq!(FileOperation::ListChildrenFiltered.category(), OperationCategory::Listing);
    }

    #[test]
    fn display_matches_identifier() {
        assert_eq!(FileOperation::CopyRemotely.to_string(), "copy_remotely");
    }
}
