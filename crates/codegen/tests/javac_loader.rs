//! Compiles generated loaders with the host JDK and runs their platform
//! detection against the shared host vectors. Skipped when no JDK is on PATH.

use jextract_codegen::{LoaderOptions, NativeLoaderGenerator};
use jextract_core::platform::{HOST_VECTORS, HostPlatform};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const PACKAGE: &str = "com.example.config";
const TEMPLATE: &str = "native/{os.name}-{os.arch}/mylib";

/// Calls the private `expandResourcePath` once per `os.name`/`os.arch` pair.
const DRIVER: &str = r#"import java.lang.reflect.InvocationTargetException;
import java.lang.reflect.Method;

public class HostVectors {
    public static void main(String[] args) throws Exception {
        final Class<?> loader = Class.forName(args[0]);
        final Method expand = loader.getDeclaredMethod("expandResourcePath", String.class);
        expand.setAccessible(true);
        for (int i = 2; i + 1 < args.length; i += 2) {
            System.setProperty("os.name", args[i]);
            System.setProperty("os.arch", args[i + 1]);
            try {
                System.out.println(expand.invoke(null, args[1]));
            } catch (InvocationTargetException e) {
                System.out.println("unsupported");
            }
        }
    }
}
"#;

struct Jdk {
    javac: PathBuf,
    java: PathBuf,
}

fn jdk() -> Option<Jdk> {
    Some(Jdk {
        javac: which::which("javac").ok()?,
        java: which::which("java").ok()?,
    })
}

fn javac(jdk: &Jdk, classes: &Path, sources: &[PathBuf]) {
    let output = Command::new(&jdk.javac)
        .arg("-d")
        .arg(classes)
        .args(sources)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "javac failed:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_generated_detection_matches_host_vectors() {
    let Some(jdk) = jdk() else {
        eprintln!("javac not found, skipping");
        return;
    };
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let classes = temp.path().join("classes");

    let mut options = LoaderOptions::new(TEMPLATE);
    options.enable_caching = true;
    let generator = NativeLoaderGenerator::new(PACKAGE, "config_h", options).unwrap();
    let loader = generator.generate(&src).unwrap();
    let driver = src.join("HostVectors.java");
    std::fs::write(&driver, DRIVER).unwrap();

    javac(&jdk, &classes, &[loader, driver]);

    let mut run = Command::new(&jdk.java);
    run.arg("-cp")
        .arg(&classes)
        .arg("HostVectors")
        .arg(format!("{PACKAGE}.{}", generator.class_name()))
        .arg(TEMPLATE);
    for (os, arch, _) in HOST_VECTORS {
        run.arg(os).arg(arch);
    }
    let output = run.output().unwrap();
    assert!(
        output.status.success(),
        "java failed:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let actual: Vec<String> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    let expected: Vec<String> = HOST_VECTORS
        .iter()
        .map(|(os, arch, _)| {
            HostPlatform::classify(os, arch)
                .map_or_else(|_| "unsupported".to_string(), |host| host.expand_resource_path(TEMPLATE))
        })
        .collect();

    assert_eq!(actual, expected);
}

#[test]
fn test_generated_loader_without_caching_compiles() {
    let Some(jdk) = jdk() else {
        eprintln!("javac not found, skipping");
        return;
    };
    let temp = TempDir::new().unwrap();

    let mut options = LoaderOptions::new(TEMPLATE);
    options.extraction_dir = Some(PathBuf::from("/opt/natives \"quoted\""));
    let loader = NativeLoaderGenerator::new(PACKAGE, "config_h", options)
        .unwrap()
        .generate(&temp.path().join("src"))
        .unwrap();

    javac(&jdk, &temp.path().join("classes"), &[loader]);
}
