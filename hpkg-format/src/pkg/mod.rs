use std::fmt;

use serde_json::{json, Value as JsonValue};

mod factory;
mod iter;

pub use self::factory::PkgFactory;
pub use self::iter::PkgIterator;

/// Package metadata assembled from one attribute tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pkg {
    pub(crate) name: String,
    pub(crate) summary: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) vendor: Option<String>,
    pub(crate) packager: Option<String>,
    pub(crate) base_package: Option<String>,
    pub(crate) checksum: Option<String>,
    pub(crate) install_path: Option<String>,
    pub(crate) flags: PkgFlags,
    pub(crate) architecture: Option<PkgArchitecture>,
    pub(crate) version: Option<PkgVersion>,
    pub(crate) copyrights: Vec<String>,
    pub(crate) licenses: Vec<String>,
    pub(crate) homepage: Option<PkgUrl>,
    pub(crate) source_urls: Vec<PkgUrl>,
    pub(crate) provides: Vec<Provide>,
    pub(crate) requires: Vec<Resolvable>,
    pub(crate) supplements: Vec<Resolvable>,
    pub(crate) conflicts: Vec<Resolvable>,
    pub(crate) freshens: Vec<Resolvable>,
    pub(crate) replaces: Vec<String>,
    pub(crate) users: Vec<PkgUser>,
    pub(crate) groups: Vec<String>,
    pub(crate) post_install_scripts: Vec<String>,
}

impl Pkg {
    /// Empty when the tree carried no name.
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    #[inline(always)]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[inline(always)]
    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    #[inline(always)]
    pub fn packager(&self) -> Option<&str> {
        self.packager.as_deref()
    }

    #[inline(always)]
    pub fn base_package(&self) -> Option<&str> {
        self.base_package.as_deref()
    }

    #[inline(always)]
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    #[inline(always)]
    pub fn install_path(&self) -> Option<&str> {
        self.install_path.as_deref()
    }

    #[inline(always)]
    pub fn flags(&self) -> PkgFlags {
        self.flags
    }

    #[inline(always)]
    pub fn architecture(&self) -> Option<PkgArchitecture> {
        self.architecture
    }

    #[inline(always)]
    pub fn version(&self) -> Option<&PkgVersion> {
        self.version.as_ref()
    }

    #[inline(always)]
    pub fn copyrights(&self) -> &[String] {
        &self.copyrights
    }

    #[inline(always)]
    pub fn licenses(&self) -> &[String] {
        &self.licenses
    }

    #[inline(always)]
    pub fn homepage(&self) -> Option<&PkgUrl> {
        self.homepage.as_ref()
    }

    #[inline(always)]
    pub fn source_urls(&self) -> &[PkgUrl] {
        &self.source_urls
    }

    #[inline(always)]
    pub fn provides(&self) -> &[Provide] {
        &self.provides
    }

    #[inline(always)]
    pub fn requires(&self) -> &[Resolvable] {
        &self.requires
    }

    #[inline(always)]
    pub fn supplements(&self) -> &[Resolvable] {
        &self.supplements
    }

    #[inline(always)]
    pub fn conflicts(&self) -> &[Resolvable] {
        &self.conflicts
    }

    #[inline(always)]
    pub fn freshens(&self) -> &[Resolvable] {
        &self.freshens
    }

    #[inline(always)]
    pub fn replaces(&self) -> &[String] {
        &self.replaces
    }

    #[inline(always)]
    pub fn users(&self) -> &[PkgUser] {
        &self.users
    }

    #[inline(always)]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    #[inline(always)]
    pub fn post_install_scripts(&self) -> &[String] {
        &self.post_install_scripts
    }

    pub fn to_json(&self) -> JsonValue {
        fn strings(values: &[String]) -> JsonValue {
            JsonValue::from(values.to_vec())
        }
        fn resolvables(values: &[Resolvable]) -> JsonValue {
            JsonValue::from(values.iter().map(Resolvable::to_string).collect::<Vec<_>>())
        }

        json!({
            "name": self.name,
            "version": self.version.as_ref().map(ToString::to_string),
            "architecture": self.architecture.map(|a| a.to_string()),
            "summary": self.summary,
            "description": self.description,
            "vendor": self.vendor,
            "packager": self.packager,
            "base_package": self.base_package,
            "checksum": self.checksum,
            "install_path": self.install_path,
            "flags": self.flags.0,
            "copyrights": strings(&self.copyrights),
            "licenses": strings(&self.licenses),
            "homepage": self.homepage.as_ref().map(PkgUrl::to_json),
            "source_urls": self.source_urls.iter().map(PkgUrl::to_json).collect::<Vec<_>>(),
            "provides": self.provides.iter().map(Provide::to_string).collect::<Vec<_>>(),
            "requires": resolvables(&self.requires),
            "supplements": resolvables(&self.supplements),
            "conflicts": resolvables(&self.conflicts),
            "freshens": resolvables(&self.freshens),
            "replaces": strings(&self.replaces),
            "users": self.users.iter().map(PkgUser::to_json).collect::<Vec<_>>(),
            "groups": strings(&self.groups),
            "post_install_scripts": strings(&self.post_install_scripts),
        })
    }
}

impl fmt::Display for Pkg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, "-{}", version)?;
        }
        if let Some(arch) = self.architecture {
            write!(f, "-{}", arch)?;
        }
        Ok(())
    }
}

/// A package version: `major[.minor[.micro]][~pre_release][-revision]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PkgVersion {
    pub major: String,
    pub minor: Option<String>,
    pub micro: Option<String>,
    pub pre_release: Option<String>,
    pub revision: Option<u32>,
}

impl fmt::Display for PkgVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.major)?;
        if let Some(minor) = &self.minor {
            write!(f, ".{}", minor)?;
            if let Some(micro) = &self.micro {
                write!(f, ".{}", micro)?;
            }
        }
        if let Some(pre) = &self.pre_release {
            write!(f, "~{}", pre)?;
        }
        if let Some(revision) = self.revision {
            write!(f, "-{}", revision)?;
        }
        Ok(())
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PkgArchitecture {
    Any,
    X86,
    X86Gcc2,
    Source,
    X86_64,
    Ppc,
    Arm,
    M68k,
    Sparc,
    Arm64,
    Riscv64,
    Unknown(u32),
}

impl PkgArchitecture {
    pub fn from_u32(value: u32) -> PkgArchitecture {
        use PkgArchitecture::*;

        match value {
            0 => Any,
            1 => X86,
            2 => X86Gcc2,
            3 => Source,
            4 => X86_64,
            5 => Ppc,
            6 => Arm,
            7 => M68k,
            8 => Sparc,
            9 => Arm64,
            10 => Riscv64,
            other => Unknown(other),
        }
    }
}

impl fmt::Display for PkgArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PkgArchitecture::*;

        let s = match self {
            Any => "any",
            X86 => "x86",
            X86Gcc2 => "x86_gcc2",
            Source => "source",
            X86_64 => "x86_64",
            Ppc => "ppc",
            Arm => "arm",
            M68k => "m68k",
            Sparc => "sparc",
            Arm64 => "arm64",
            Riscv64 => "riscv64",
            Unknown(id) => return write!(f, "unknown({})", id),
        };

        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PkgFlags(pub u32);

impl PkgFlags {
    pub const APPROVE_LICENSE: PkgFlags = PkgFlags(1);
    pub const SYSTEM_PACKAGE: PkgFlags = PkgFlags(2);

    #[inline(always)]
    pub fn contains(self, other: PkgFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Display for PkgFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = vec![];
        if self.contains(PkgFlags::APPROVE_LICENSE) {
            names.push("approve_license");
        }
        if self.contains(PkgFlags::SYSTEM_PACKAGE) {
            names.push("system_package");
        }
        if names.is_empty() {
            return f.write_str("none");
        }
        f.write_str(&names.join("|"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PkgUrlKind {
    Homepage,
    Source,
}

/// A URL as written in package metadata, optionally `Name <url>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgUrl {
    pub kind: PkgUrlKind,
    pub url: String,
    pub name: Option<String>,
}

impl PkgUrl {
    /// `None` when the input is blank.
    pub fn parse(input: &str, kind: PkgUrlKind) -> Option<PkgUrl> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let named = input
            .strip_suffix('>')
            .and_then(|rest| rest.rfind('<').map(|i| (&rest[..i], &rest[i + 1..])))
            .filter(|(name, url)| {
                !url.is_empty()
                    && !url.contains(|c: char| c == '<' || c == '>' || c == ' ')
                    && !name.contains(|c: char| c == '<' || c == '>')
            });

        Some(match named {
            Some((name, url)) => PkgUrl {
                kind,
                url: url.to_string(),
                name: Some(name.trim())
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
            },
            None => PkgUrl {
                kind,
                url: input.to_string(),
                name: None,
            },
        })
    }

    fn to_json(&self) -> JsonValue {
        json!({ "url": self.url, "name": self.name })
    }
}

impl fmt::Display for PkgUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.url),
            None => f.write_str(&self.url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvableOperator {
    Less,
    LessEqual,
    Equal,
    NotEqual,
    GreaterEqual,
    Greater,
}

impl ResolvableOperator {
    pub fn from_i128(value: i128) -> Option<ResolvableOperator> {
        use ResolvableOperator::*;

        Some(match value {
            0 => Less,
            1 => LessEqual,
            2 => Equal,
            3 => NotEqual,
            4 => GreaterEqual,
            5 => Greater,
            _ => return None,
        })
    }

    pub const fn as_str(self) -> &'static str {
        use ResolvableOperator::*;

        match self {
            Less => "<",
            LessEqual => "<=",
            Equal => "==",
            NotEqual => "!=",
            GreaterEqual => ">=",
            Greater => ">",
        }
    }
}

impl fmt::Display for ResolvableOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something a package provides, with its version and the oldest version
/// it stays compatible with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provide {
    pub name: String,
    pub version: Option<PkgVersion>,
    pub compatible: Option<PkgVersion>,
}

impl fmt::Display for Provide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, " = {}", version)?;
        }
        if let Some(compatible) = &self.compatible {
            write!(f, " compat >= {}", compatible)?;
        }
        Ok(())
    }
}

/// A dependency expression: `name [op version]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolvable {
    pub name: String,
    pub operator: Option<ResolvableOperator>,
    pub version: Option<PkgVersion>,
}

impl fmt::Display for Resolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        match (&self.operator, &self.version) {
            (Some(op), Some(version)) => write!(f, " {} {}", op, version),
            (None, Some(version)) => write!(f, " {}", version),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PkgUser {
    pub name: String,
    pub real_name: Option<String>,
    pub home: Option<String>,
    pub shell: Option<String>,
    pub groups: Vec<String>,
}

impl PkgUser {
    fn to_json(&self) -> JsonValue {
        json!({
            "name": self.name,
            "real_name": self.real_name,
            "home": self.home,
            "shell": self.shell,
            "groups": self.groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(major: &str) -> PkgVersion {
        PkgVersion {
            major: major.into(),
            ..PkgVersion::default()
        }
    }

    #[test]
    fn version_display() {
        let v = PkgVersion {
            major: "6".into(),
            minor: Some("32".into()),
            micro: Some("9".into()),
            pre_release: Some("beta".into()),
            revision: Some(8),
        };
        assert_eq!(v.to_string(), "6.32.9~beta-8");
        assert_eq!(version("1.0").to_string(), "1.0");

        let micro_without_minor = PkgVersion {
            micro: Some("3".into()),
            ..version("2")
        };
        assert_eq!(micro_without_minor.to_string(), "2");
    }

    #[test]
    fn url_forms() {
        let named = PkgUrl::parse("Haiku, Inc. <https://haiku-os.org>", PkgUrlKind::Homepage)
            .unwrap();
        assert_eq!(named.name.as_deref(), Some("Haiku, Inc."));
        assert_eq!(named.url, "https://haiku-os.org");

        let bare = PkgUrl::parse("  https://example.com  ", PkgUrlKind::Source).unwrap();
        assert_eq!(bare.url, "https://example.com");
        assert!(bare.name.is_none());

        let only_brackets = PkgUrl::parse("<http://x>", PkgUrlKind::Homepage).unwrap();
        assert_eq!(only_brackets.url, "http://x");
        assert!(only_brackets.name.is_none());

        let spaced = PkgUrl::parse("a <b c>", PkgUrlKind::Homepage).unwrap();
        assert_eq!(spaced.url, "a <b c>");

        assert!(PkgUrl::parse("   ", PkgUrlKind::Homepage).is_none());
    }

    #[test]
    fn architecture_codes() {
        assert_eq!(PkgArchitecture::from_u32(1), PkgArchitecture::X86);
        assert_eq!(PkgArchitecture::from_u32(10).to_string(), "riscv64");
        assert_eq!(PkgArchitecture::from_u32(42), PkgArchitecture::Unknown(42));
    }

    #[test]
    fn flags() {
        let flags = PkgFlags(3);
        assert!(flags.contains(PkgFlags::SYSTEM_PACKAGE));
        assert_eq!(flags.to_string(), "approve_license|system_package");
        assert_eq!(PkgFlags::default().to_string(), "none");
    }

    #[test]
    fn resolvable_display() {
        let r = Resolvable {
            name: "lib:libfoo".into(),
            operator: ResolvableOperator::from_i128(4),
            version: Some(version("1.2")),
        };
        assert_eq!(r.to_string(), "lib:libfoo >= 1.2");
        assert!(ResolvableOperator::from_i128(6).is_none());
    }

    #[test]
    fn json_shape() {
        let pkg = Pkg {
            name: "example".into(),
            version: Some(version("1.0")),
            licenses: vec!["MIT".into()],
            ..Pkg::default()
        };
        let json = pkg.to_json();
        assert_eq!(json["name"], "example");
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["licenses"][0], "MIT");
        assert!(json["summary"].is_null());
        assert_eq!(pkg.to_string(), "example-1.0");
    }
}
