//! Permission bits over {user, group, other} × {read, write, execute}.
//!
//! Three pieces:
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FilePermissions`] | Snapshot of 9 bits plus a mask of the bits the backend actually knows |
//! | [`GroupedPermissionBits`] | Contiguous 3-bit groups, set or cleared in one shift |
//! | [`ProbedPermissionBits`] | Each bit asked of the backend separately through a [`PermissionProbe`] |
//!
//! [`ChangeablePermissions`] is the per-backend mask of bits that may be
//! mutated. Changing a bit outside it fails with
//! [`FileError::Unsupported`] instead of silently doing nothing.

use crate::{FileError, FileOperation};

/// The three permission classes, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PermissionAccess {
    /// Owner of the file.
    User,
    /// Owning group.
    Group,
    /// Everyone else.
    Other,
}

impl PermissionAccess {
    /// All classes, user first.
    pub const ALL: [PermissionAccess; 3] = [
        PermissionAccess::User,
        PermissionAccess::Group,
        PermissionAccess::Other,
    ];

    const fn shift(self) -> u16 {
        match self {
            PermissionAccess::User => 6,
            PermissionAccess::Group => 3,
            PermissionAccess::Other => 0,
        }
    }
}

/// The three permission kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PermissionType {
    /// Read.
    Read,
    /// Write.
    Write,
    /// Execute (or traverse for directories).
    Execute,
}

impl PermissionType {
    /// All kinds in `rwx` order.
    pub const ALL: [PermissionType; 3] = [
        PermissionType::Read,
        PermissionType::Write,
        PermissionType::Execute,
    ];

    const fn bit(self) -> u16 {
        match self {
            PermissionType::Read => 4,
            PermissionType::Write => 2,
            PermissionType::Execute => 1,
        }
    }

    const fn letter(self) -> char {
        match self {
            PermissionType::Read => 'r',
            PermissionType::Write => 'w',
            PermissionType::Execute => 'x',
        }
    }
}

/// Single bit for `(access, kind)`.
pub const fn permission_bit(access: PermissionAccess, kind: PermissionType) -> u16 {
    kind.bit() << access.shift()
}

const ALL_BITS: u16 = 0o777;

/// Read access to a 9-bit permission vector.
pub trait PermissionBits {
    /// The bits as an integer (`0o755` style).
    fn int_value(&self) -> u16;

    /// Whether a single bit is set.
    fn bit_value(&self, access: PermissionAccess, kind: PermissionType) -> bool {
        self.int_value() & permission_bit(access, kind) != 0
    }
}

/// Permission snapshot: a value and the mask of bits the backend reports.
///
/// Bits outside the mask are unknown, not cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilePermissions {
    value: u16,
    mask: u16,
}

impl FilePermissions {
    /// No bits known.
    pub const EMPTY: FilePermissions = FilePermissions { value: 0, mask: 0 };

    /// `rw-r--r--`, all bits known.
    pub const DEFAULT_FILE: FilePermissions = FilePermissions {
        value: 0o644,
        mask: ALL_BITS,
    };

    /// `rwxr-xr-x`, all bits known.
    pub const DEFAULT_DIRECTORY: FilePermissions = FilePermissions {
        value: 0o755,
        mask: ALL_BITS,
    };

    /// Create from value and mask; both are clipped to 9 bits.
    pub const fn new(value: u16, mask: u16) -> Self {
        Self {
            value: value & mask & ALL_BITS,
            mask: mask & ALL_BITS,
        }
    }

    /// Create from a Unix mode with every bit known.
    pub const fn from_mode(mode: u32) -> Self {
        Self::new((mode & 0o777) as u16, ALL_BITS)
    }

    /// Mask of the bits the backend reports.
    pub const fn mask(&self) -> u16 {
        self.mask
    }

    /// Whether `(access, kind)` is known.
    pub const fn is_supported(&self, access: PermissionAccess, kind: PermissionType) -> bool {
        self.mask & permission_bit(access, kind) != 0
    }

    /// Copy with one bit set or cleared (and marked known).
    pub const fn with_bit(self, access: PermissionAccess, kind: PermissionType, enabled: bool) -> Self {
        let bit = permission_bit(access, kind);
        let value = if enabled {
            self.value | bit
        } else {
            self.value & !bit
        };
        Self {
            value,
            mask: self.mask | bit,
        }
    }

    /// `ls -l` style string; unknown bits render as `?`.
    pub fn to_unix_string(&self) -> String {
        let mut out = String::with_capacity(9);
        for access in PermissionAccess::ALL {
            for kind in PermissionType::ALL {
                let bit = permission_bit(access, kind);
                out.push(if self.mask & bit == 0 {
                    '?'
                } else if self.value & bit != 0 {
                    kind.letter()
                } else {
                    '-'
                });
            }
        }
        out
    }
}

impl Default for FilePermissions {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl PermissionBits for FilePermissions {
    fn int_value(&self) -> u16 {
        self.value
    }
}

/// Permission bits manipulated one contiguous group at a time.
///
/// ```rust
/// use anyfile::{GroupedPermissionBits, PermissionAccess, PermissionBits};
///
/// let owner_write = GroupedPermissionBits::EMPTY.with_group(PermissionAccess::User, 0b010);
/// assert_eq!(owner_write.int_value(), 0o200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GroupedPermissionBits(u16);

impl GroupedPermissionBits {
    /// No bits set.
    pub const EMPTY: GroupedPermissionBits = GroupedPermissionBits(0);

    /// Only the owner write bit.
    pub const OWNER_WRITE: GroupedPermissionBits = GroupedPermissionBits(0o200);

    /// Create from raw bits.
    pub const fn new(bits: u16) -> Self {
        Self(bits & ALL_BITS)
    }

    /// Copy with the whole `access` group replaced by `rwx` (3 bits).
    pub const fn with_group(self, access: PermissionAccess, rwx: u16) -> Self {
        let shift = access.shift();
        let cleared = self.0 & !(0b111 << shift);
        Self(cleared | ((rwx & 0b111) << shift))
    }

    /// Copy with the whole `access` group cleared.
    pub const fn without_group(self, access: PermissionAccess) -> Self {
        self.with_group(access, 0)
    }

    /// The 3 bits of one group.
    pub const fn group(&self, access: PermissionAccess) -> u16 {
        (self.0 >> access.shift()) & 0b111
    }

    /// Snapshot with every bit known.
    pub const fn to_permissions(self) -> FilePermissions {
        FilePermissions::new(self.0, ALL_BITS)
    }
}

impl PermissionBits for GroupedPermissionBits {
    fn int_value(&self) -> u16 {
        self.0
    }
}

/// Backend hook answering one permission bit at a time.
pub trait PermissionProbe {
    /// Whether `(access, kind)` is granted.
    fn probe(&self, access: PermissionAccess, kind: PermissionType) -> bool;

    /// Set or clear one bit.
    fn apply(&self, access: PermissionAccess, kind: PermissionType, enabled: bool) -> Result<(), FileError>;
}

/// Permission bits answered by asking the backend bit by bit.
///
/// Only the bits in `supported` are ever asked; the others read as unset.
pub struct ProbedPermissionBits<'a, P: PermissionProbe + ?Sized> {
    probe: &'a P,
    supported: u16,
}

impl<'a, P: PermissionProbe + ?Sized> ProbedPermissionBits<'a, P> {
    /// Wrap a probe; `supported` lists the bits the backend can answer.
    pub fn new(probe: &'a P, supported: u16) -> Self {
        Self {
            probe,
            supported: supported & ALL_BITS,
        }
    }

    /// Query every supported bit and freeze the result.
    pub fn snapshot(&self) -> FilePermissions {
        FilePermissions::new(self.int_value(), self.supported)
    }

    /// Set or clear one bit through the probe.
    ///
    /// # Errors
    ///
    /// [`FileError::Unsupported`] if the bit is not supported by the backend.
    pub fn set_bit_value(
        &self,
        access: PermissionAccess,
        kind: PermissionType,
        enabled: bool,
    ) -> Result<(), FileError> {
        if self.supported & permission_bit(access, kind) == 0 {
            return Err(FileError::unsupported(FileOperation::ChangePermissions));
        }
        self.probe.apply(access, kind, enabled)
    }
}

impl<P: PermissionProbe + ?Sized> PermissionBits for ProbedPermissionBits<'_, P> {
    fn int_value(&self) -> u16 {
        let mut value = 0;
        for access in PermissionAccess::ALL {
            for kind in PermissionType::ALL {
                let bit = permission_bit(access, kind);
                if self.supported & bit != 0 && self.probe.probe(access, kind) {
                    value |= bit;
                }
            }
        }
        value
    }

    fn bit_value(&self, access: PermissionAccess, kind: PermissionType) -> bool {
        self.supported & permission_bit(access, kind) != 0 && self.probe.probe(access, kind)
    }
}

/// Mask of permission bits a backend can mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeablePermissions(u16);

impl ChangeablePermissions {
    /// Nothing can be changed.
    pub const NONE: ChangeablePermissions = ChangeablePermissions(0);

    /// All nine bits can be changed.
    pub const ALL: ChangeablePermissions = ChangeablePermissions(ALL_BITS);

    /// Only the owner write bit (read-only attribute style).
    pub const OWNER_WRITE: ChangeablePermissions = ChangeablePermissions(0o200);

    /// Create from raw bits.
    pub const fn new(mask: u16) -> Self {
        Self(mask & ALL_BITS)
    }

    /// `mask` when a runtime capability is present, otherwise `fallback`.
    ///
    /// Used for bits whose mutability depends on the platform version or a
    /// server feature discovered at runtime.
    pub const fn gated(available: bool, mask: u16, fallback: u16) -> Self {
        if available {
            Self::new(mask)
        } else {
            Self::new(fallback)
        }
    }

    /// Mask of the local platform.
    pub const fn local() -> Self {
        if cfg!(unix) {
            Self::ALL
        } else if cfg!(windows) {
            Self::OWNER_WRITE
        } else {
            Self::NONE
        }
    }

    /// Raw mask.
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Returns `true` if no bit can be changed.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether one bit is changeable.
    pub const fn allows(&self, access: PermissionAccess, kind: PermissionType) -> bool {
        self.0 & permission_bit(access, kind) != 0
    }

    /// Check that going from `current` to `requested` only touches
    /// changeable bits.
    ///
    /// # Errors
    ///
    /// [`FileError::Unsupported`] with [`FileOperation::ChangePermissions`]
    /// if any other bit would change.
    pub fn check(&self, current: u16, requested: u16) -> Result<(), FileError> {
        let changed = (current ^ requested) & ALL_BITS;
        if changed & !self.0 != 0 {
            return Err(FileError::unsupported(FileOperation::ChangePermissions));
        }
        Ok(())
    }
}
