//! Shared fixtures for integration tests.
//!
//! JDKs are laid out in real temporary directories. The fake `javac` is a
//! text file holding the banner it should print, so no JDK needs to be
//! installed to run these tests.

#![allow(dead_code)]

use futures::future::BoxFuture;
use futures::FutureExt;
use jdk_discovery::{CommandOutput, Host, Platform, SystemHost, Tool};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Real filesystem, no `PATH` or environment, scripted compiler output.
#[derive(Debug, Default)]
pub struct TestHost;

impl TestHost {
    pub fn shared() -> Arc<dyn Host> {
        Arc::new(Self)
    }
}

impl Host for TestHost {
    fn which(&self, _name: &str) -> Option<PathBuf> {
        None
    }

    fn env_var(&self, _name: &str) -> Option<String> {
        None
    }

    fn realpath(&self, path: &Path) -> io::Result<PathBuf> {
        SystemHost.realpath(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        SystemHost.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        SystemHost.is_file(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        SystemHost.read_dir(path)
    }

    fn run<'a>(
        &'a self,
        program: &'a Path,
        _args: &'a [&'a str],
    ) -> BoxFuture<'a, io::Result<CommandOutput>> {
        async move {
            let banner = std::fs::read_to_string(program)?;
            Ok(CommandOutput {
                success: true,
                stdout: String::new(),
                stderr: banner,
            })
        }
        .boxed()
    }

    fn registry_value<'a>(
        &'a self,
        _key: &'a str,
        _name: &'a str,
    ) -> BoxFuture<'a, Option<String>> {
        futures::future::ready(None).boxed()
    }
}

/// Lay out a JDK at `home` whose compiler reports `banner`.
pub fn write_jdk(home: &Path, platform: Platform, banner: &str) {
    let libjvm = home.join(platform.libjvm_paths()[0]);
    std::fs::create_dir_all(libjvm.parent().unwrap()).unwrap();
    std::fs::write(&libjvm, b"").unwrap();

    let bin = home.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    for tool in Tool::all() {
        let contents = if tool == Tool::Javac { banner } else { "" };
        std::fs::write(bin.join(tool.file_name(platform.exe_suffix())), contents).unwrap();
    }
}
