use std::convert::TryFrom;

use super::{
    Pkg, PkgArchitecture, PkgFlags, PkgUrl, PkgUrlKind, PkgUser, PkgVersion, Provide, Resolvable,
    ResolvableOperator,
};
use crate::attr::Attribute;
use crate::context::AttributeContext;
use crate::error::AssemblyError;
use crate::id::{AttributeId, AttributeType};

/// Builds [`Pkg`] values out of decoded attribute trees.
///
/// A `package` root names the package and its children are the fields.
/// Any other root is itself a field, and its children are fields too unless
/// the field reads them itself (versions, provides, dependency lists and
/// users). Ids that are not package fields are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct PkgFactory;

impl PkgFactory {
    pub fn new() -> PkgFactory {
        PkgFactory
    }

    pub fn create_package(
        &self,
        context: &AttributeContext,
        attribute: &Attribute,
    ) -> Result<Pkg, AssemblyError> {
        let mut pkg = Pkg::default();
        self.apply_root(context, attribute, &mut pkg)?;
        Ok(pkg)
    }

    /// Assembles one package from a flat list of roots, as stored in the
    /// package attributes section of an `.hpkg`.
    pub fn create_package_from_attributes(
        &self,
        context: &AttributeContext,
        attributes: &[Attribute],
    ) -> Result<Pkg, AssemblyError> {
        let mut pkg = Pkg::default();
        for attribute in attributes {
            self.apply_root(context, attribute, &mut pkg)?;
        }
        Ok(pkg)
    }

    fn apply_root(
        &self,
        context: &AttributeContext,
        root: &Attribute,
        pkg: &mut Pkg,
    ) -> Result<(), AssemblyError> {
        if root.id() == AttributeId::Package {
            pkg.name = string(context, root)?;
        } else {
            self.apply_field(context, root, pkg)?;
            if reads_own_children(root.id()) {
                return Ok(());
            }
        }

        for child in root.children() {
            self.apply_field(context, child, pkg)?;
        }

        Ok(())
    }

    fn apply_field(
        &self,
        context: &AttributeContext,
        attr: &Attribute,
        pkg: &mut Pkg,
    ) -> Result<(), AssemblyError> {
        use AttributeId::*;

        match attr.id() {
            PackageName => pkg.name = string(context, attr)?,
            PackageSummary => pkg.summary = Some(string(context, attr)?),
            PackageDescription => pkg.description = Some(string(context, attr)?),
            PackageVendor => pkg.vendor = Some(string(context, attr)?),
            PackagePackager => pkg.packager = Some(string(context, attr)?),
            PackageBasePackage => pkg.base_package = Some(string(context, attr)?),
            PackageChecksum => pkg.checksum = Some(string(context, attr)?),
            PackageInstallPath => pkg.install_path = Some(string(context, attr)?),
            PackageFlags => pkg.flags = PkgFlags(uint32(attr)?),
            PackageArchitecture => {
                pkg.architecture = Some(PkgArchitecture::from_u32(uint32(attr)?))
            }
            PackageVersionMajor => pkg.version = Some(version(context, attr)?),
            PackageCopyright => pkg.copyrights.push(string(context, attr)?),
            PackageLicense => pkg.licenses.push(string(context, attr)?),
            PackageUrl => {
                pkg.homepage = PkgUrl::parse(&string(context, attr)?, PkgUrlKind::Homepage)
            }
            PackageSourceUrl => pkg
                .source_urls
                .extend(PkgUrl::parse(&string(context, attr)?, PkgUrlKind::Source)),
            PackageProvides => pkg.provides.push(provide(context, attr)?),
            PackageRequires => pkg.requires.push(resolvable(context, attr)?),
            PackageSupplements => pkg.supplements.push(resolvable(context, attr)?),
            PackageConflicts => pkg.conflicts.push(resolvable(context, attr)?),
            PackageFreshens => pkg.freshens.push(resolvable(context, attr)?),
            PackageReplaces => pkg.replaces.push(string(context, attr)?),
            PackageUser => pkg.users.push(user(context, attr)?),
            PackageGroup => pkg.groups.push(string(context, attr)?),
            PackagePostInstallScript => pkg.post_install_scripts.push(string(context, attr)?),
            other => tracing::trace!(id = other.name(), "skipped attribute"),
        }

        Ok(())
    }
}

fn reads_own_children(id: AttributeId) -> bool {
    use AttributeId::*;

    matches!(
        id,
        PackageVersionMajor
            | PackageProvides
            | PackageRequires
            | PackageSupplements
            | PackageConflicts
            | PackageFreshens
            | PackageUser
    )
}

fn expect(attr: &Attribute, expected: AttributeType) -> Result<(), AssemblyError> {
    let found = attr.attribute_type();
    if found != expected {
        return Err(AssemblyError::KindMismatch {
            id: attr.id(),
            expected,
            found,
        });
    }
    Ok(())
}

fn string(context: &AttributeContext, attr: &Attribute) -> Result<String, AssemblyError> {
    expect(attr, AttributeType::String)?;
    attr.str_value(context)
        .map(str::to_string)
        .map_err(|source| AssemblyError::Value {
            id: attr.id(),
            source,
        })
}

fn uint32(attr: &Attribute) -> Result<u32, AssemblyError> {
    expect(attr, AttributeType::Int)?;
    let value = attr.int_value();
    u32::try_from(value).map_err(|_| AssemblyError::OutOfRange {
        id: attr.id(),
        value,
    })
}

/// A version whose major part is the attribute's own value.
fn version(context: &AttributeContext, attr: &Attribute) -> Result<PkgVersion, AssemblyError> {
    let mut version = PkgVersion {
        major: string(context, attr)?,
        ..PkgVersion::default()
    };

    for child in attr.children() {
        match child.id() {
            AttributeId::PackageVersionMinor => version.minor = Some(string(context, child)?),
            AttributeId::PackageVersionMicro => version.micro = Some(string(context, child)?),
            AttributeId::PackageVersionPreRelease => {
                version.pre_release = Some(string(context, child)?)
            }
            AttributeId::PackageVersionRevision => version.revision = Some(uint32(child)?),
            _ => {}
        }
    }

    Ok(version)
}

fn provide(context: &AttributeContext, attr: &Attribute) -> Result<Provide, AssemblyError> {
    let mut provide = Provide {
        name: string(context, attr)?,
        ..Provide::default()
    };

    for child in attr.children() {
        match child.id() {
            AttributeId::PackageVersionMajor => provide.version = Some(version(context, child)?),
            AttributeId::PackageProvidesCompatible => {
                provide.compatible = Some(version(context, child)?)
            }
            _ => {}
        }
    }

    Ok(provide)
}

fn resolvable(context: &AttributeContext, attr: &Attribute) -> Result<Resolvable, AssemblyError> {
    let mut resolvable = Resolvable {
        name: string(context, attr)?,
        ..Resolvable::default()
    };

    for child in attr.children() {
        match child.id() {
            AttributeId::PackageResolvableOperator => {
                expect(child, AttributeType::Int)?;
                let value = child.int_value();
                let op = ResolvableOperator::from_i128(value).ok_or(AssemblyError::OutOfRange {
                    id: child.id(),
                    value,
                })?;
                resolvable.operator = Some(op);
            }
            AttributeId::PackageVersionMajor => {
                resolvable.version = Some(version(context, child)?)
            }
            _ => {}
        }
    }

    Ok(resolvable)
}

fn user(context: &AttributeContext, attr: &Attribute) -> Result<PkgUser, AssemblyError> {
    let mut user = PkgUser {
        name: string(context, attr)?,
        ..PkgUser::default()
    };

    for child in attr.children() {
        match child.id() {
            AttributeId::PackageUserRealName => user.real_name = Some(string(context, child)?),
            AttributeId::PackageUserHome => user.home = Some(string(context, child)?),
            AttributeId::PackageUserShell => user.shell = Some(string(context, child)?),
            AttributeId::PackageUserGroup => user.groups.push(string(context, child)?),
            _ => {}
        }
    }

    Ok(user)
}
