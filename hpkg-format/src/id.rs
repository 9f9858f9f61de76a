use std::fmt;

/// The data type an attribute carries once decoded.
///
/// Signed and unsigned integers on disk both decode to [`AttributeType::Int`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Int,
    String,
    Raw,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttributeType::Int => "INT",
            AttributeType::String => "STRING",
            AttributeType::Raw => "RAW",
        };

        f.write_str(s)
    }
}

macro_rules! attribute_ids {
    ($($variant:ident = $code:literal, $name:literal, $ty:ident;)*) => {
        /// What an attribute means, independent of how its value was encoded.
        ///
        /// The numeric code is the 7-bit id carried in each attribute tag; the
        /// name matches the one used by Haiku's own tooling.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum AttributeId {
            $($variant = $code,)*
        }

        impl AttributeId {
            /// Every known id, in code order.
            pub const ALL: &'static [AttributeId] = &[$(AttributeId::$variant,)*];

            pub fn from_code(code: u64) -> Option<AttributeId> {
                match code {
                    $($code => Some(AttributeId::$variant),)*
                    _ => None,
                }
            }

            #[inline(always)]
            pub const fn code(self) -> u8 {
                self as u8
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(AttributeId::$variant => $name,)*
                }
            }

            /// The type every attribute with this id is required to have.
            pub const fn attribute_type(self) -> AttributeType {
                match self {
                    $(AttributeId::$variant => AttributeType::$ty,)*
                }
            }
        }
    };
}

attribute_ids! {
    DirectoryEntry = 0, "dir:entry", String;
    FileType = 1, "file:type", Int;
    FilePermissions = 2, "file:permissions", Int;
    FileUser = 3, "file:user", String;
    FileGroup = 4, "file:group", String;
    FileAtime = 5, "file:atime", Int;
    FileMtime = 6, "file:mtime", Int;
    FileCrtime = 7, "file:crtime", Int;
    FileAtimeNanos = 8, "file:atime:nanos", Int;
    FileMtimeNanos = 9, "file:mtime:nanos", Int;
    FileCrtimeNanos = 10, "file:crtime:nanos", Int;
    FileAttribute = 11, "file:attribute", String;
    FileAttributeType = 12, "file:attribute:type", Int;
    Data = 13, "data", Raw;
    SymlinkPath = 14, "symlink:path", String;
    PackageName = 15, "package:name", String;
    PackageSummary = 16, "package:summary", String;
    PackageDescription = 17, "package:description", String;
    PackageVendor = 18, "package:vendor", String;
    PackagePackager = 19, "package:packager", String;
    PackageFlags = 20, "package:flags", Int;
    PackageArchitecture = 21, "package:architecture", Int;
    PackageVersionMajor = 22, "package:version.major", String;
    PackageVersionMinor = 23, "package:version.minor", String;
    PackageVersionMicro = 24, "package:version.micro", String;
    PackageVersionRevision = 25, "package:version.revision", Int;
    PackageCopyright = 26, "package:copyright", String;
    PackageLicense = 27, "package:license", String;
    PackageProvides = 28, "package:provides", String;
    PackageRequires = 29, "package:requires", String;
    PackageSupplements = 30, "package:supplements", String;
    PackageConflicts = 31, "package:conflicts", String;
    PackageFreshens = 32, "package:freshens", String;
    PackageReplaces = 33, "package:replaces", String;
    PackageResolvableOperator = 34, "package:resolvable.operator", Int;
    PackageChecksum = 35, "package:checksum", String;
    PackageVersionPreRelease = 36, "package:version.prerelease", String;
    PackageProvidesCompatible = 37, "package:provides.compatible", String;
    PackageUrl = 38, "package:url", String;
    PackageSourceUrl = 39, "package:source-url", String;
    PackageInstallPath = 40, "package:install-path", String;
    PackageBasePackage = 41, "package:base-package", String;
    PackageGlobalWritableFile = 42, "package:global-writable-file", String;
    PackageUserSettingsFile = 43, "package:user-settings-file", String;
    PackageWritableFileUpdateType = 44, "package:writable-file-update-type", Int;
    PackageSettingsFileTemplate = 45, "package:settings-file-template", String;
    PackageUser = 46, "package:user", String;
    PackageUserRealName = 47, "package:user.real-name", String;
    PackageUserHome = 48, "package:user.home", String;
    PackageUserShell = 49, "package:user.shell", String;
    PackageUserGroup = 50, "package:user.group", String;
    PackageGroup = 51, "package:group", String;
    PackagePostInstallScript = 52, "package:post-install-script", String;
    PackageIsWritableDirectory = 53, "package:is-writable-directory", Int;
    Package = 54, "package", String;
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
