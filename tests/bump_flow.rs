//! End-to-end bump flow against a scripted p4 stub.

#![cfg(unix)]

use std::path::{Path, PathBuf};

use p4bump::bump::{self, BumpError};
use p4bump::config::BumpConfig;
use p4bump::perforce::Perforce;
use p4bump::version::{self, Version};

fn write_stub(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("p4-stub.sh");
    std::fs::write(&path, body).expect("write stub");
    let mut perms = std::fs::metadata(&path).expect("stat stub").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod stub");
    path
}

const SCRIPTED_P4: &str = concat!(
    "#!/bin/sh\n",
    "dir=$(dirname \"$0\")\n",
    "case \"$*\" in\n",
    "  *'login -s'*) printf '... User builder\\n' ;;\n",
    "  *'changes -ssubmitted'*) printf '... change 9105\\n... user alice\\n... desc Latest\\n' ;;\n",
    "  *' sync -f '*) printf '//game/main/... - updating\\n' ;;\n",
    "  *'change -i'*) cat > \"$dir/form.txt\"; echo 'Change 777 created.' ;;\n",
    "  *' edit -c '*) echo \"args: $*\" > \"$dir/edit.txt\" ;;\n",
    "  *) echo \"unexpected: $*\" >&2; exit 1 ;;\n",
    "esac\n",
);

#[tokio::test]
async fn bump_creates_changelist_and_rewrites_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stub = write_stub(dir.path(), SCRIPTED_P4);

    let version_file = dir.path().join("version.json");
    version::write(&version_file, &Version { build: 41, cl: 9000 }).expect("seed manifest");

    let config = BumpConfig {
        workspace: "ws_build".to_string(),
        depot: "//game/main".to_string(),
        version_file: version_file.clone(),
        p4_executable: Some(stub.to_string_lossy().into_owned()),
        sync: true,
    };
    let p4 = Perforce::with_executable(stub.to_string_lossy());

    let outcome = bump::run(&p4, &config).await.expect("bump");
    assert_eq!(outcome.changelist, 777);
    assert_eq!(outcome.version, Version { build: 42, cl: 9105 });

    // Manifest rewritten on disk.
    let on_disk = version::read(&version_file).expect("read back");
    assert_eq!(on_disk, Version { build: 42, cl: 9105 });

    // Change form carried the build description.
    let form = std::fs::read_to_string(dir.path().join("form.txt")).expect("form");
    assert!(form.contains("Client:\tws_build"));
    assert!(form.contains("Description:\n\tUpdated version file for build 42"));

    // The depot copy of the manifest was opened for edit in the new CL.
    let edit = std::fs::read_to_string(dir.path().join("edit.txt")).expect("edit");
    assert!(edit.contains("-c ws_build edit -c 777 //game/main/version.json"));

    assert_eq!(p4.username().as_deref(), Some("builder"));
    assert!(p4.in_flight().is_empty());
}

#[tokio::test]
async fn bump_fails_when_depot_has_no_changes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stub = write_stub(
        dir.path(),
        concat!(
            "#!/bin/sh\n",
            "case \"$*\" in\n",
            "  *'login -s'*) printf '... User builder\\n' ;;\n",
            "  *) exit 0 ;;\n",
            "esac\n",
        ),
    );

    let config = BumpConfig {
        workspace: "ws_build".to_string(),
        depot: "//empty/depot".to_string(),
        version_file: dir.path().join("version.json"),
        p4_executable: Some(stub.to_string_lossy().into_owned()),
        sync: false,
    };
    let p4 = Perforce::with_executable(stub.to_string_lossy());

    let err = bump::run(&p4, &config).await.expect_err("no changes");
    assert!(matches!(err, BumpError::NoChanges(_)));
}
