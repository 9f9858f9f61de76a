use std::path::Path;

use hpkg_format::Pkg;

use super::{open, Container};
use crate::error::{Error, Result};

const WRAP_WIDTH: usize = 76;

fn field(name: &str, value: Option<&str>) {
    if let Some(value) = value {
        println!("  {:<14}{}", format!("{}:", name), value);
    }
}

fn list<T: ToString>(name: &str, values: &[T]) {
    for value in values {
        println!("  {:<14}{}", format!("{}:", name), value.to_string());
    }
}

fn print(pkg: &Pkg) {
    println!("{}", pkg);
    field("summary", pkg.summary());
    field("vendor", pkg.vendor());
    field("packager", pkg.packager());
    field("base package", pkg.base_package());
    field("install path", pkg.install_path());
    field("checksum", pkg.checksum());
    if pkg.flags().0 != 0 {
        println!("  {:<14}{}", "flags:", pkg.flags());
    }
    if let Some(url) = pkg.homepage() {
        println!("  {:<14}{}", "homepage:", url);
    }
    list("source", pkg.source_urls());
    list("copyright", pkg.copyrights());
    list("license", pkg.licenses());
    list("provides", pkg.provides());
    list("requires", pkg.requires());
    list("supplements", pkg.supplements());
    list("conflicts", pkg.conflicts());
    list("freshens", pkg.freshens());
    list("replaces", pkg.replaces());
    list("group", pkg.groups());
    for user in pkg.users() {
        println!("  {:<14}{}", "user:", user.name);
    }
    list("post-install", pkg.post_install_scripts());

    if let Some(description) = pkg.description() {
        println!("  description:");
        let wrapped = textwrap::fill(description, WRAP_WIDTH);
        println!("{}", textwrap::indent(&wrapped, "    "));
    }
}

pub fn run(path: &Path, json: bool) -> Result<()> {
    let package_error = |source| Error::Package {
        path: path.to_path_buf(),
        source,
    };

    let pkgs = match open(path)? {
        Container::Package(file) => vec![file.package().map_err(package_error)?],
        Container::Repository(file) => file
            .packages()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(package_error)?,
    };

    if json {
        let value = serde_json::Value::from(pkgs.iter().map(Pkg::to_json).collect::<Vec<_>>());
        let text =
            serde_json::to_string_pretty(&value).map_err(|source| Error::Json { source })?;
        println!("{}", text);
        return Ok(());
    }

    for (i, pkg) in pkgs.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print(pkg);
    }

    Ok(())
}
