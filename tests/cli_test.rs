use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
use std::process::{Command,Stdio}; // Run programs
use std::path::Path;
use std::fs::File;

const UNFORMATTED: &str = "/PROG  TEST
/ATTR
/MN
   1:  IF R[1]=1 THEN ;
   2:  CALL A ;
   3:  ENDIF ;
/POS
/END
";

#[test]
fn verify_tp_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("verify")
        .arg("-f").arg(Path::new("tests").join("tp").join("main_prog.ls"))
        .assert()
        .success()
        .stderr(predicate::str::contains("Syntax OK"))
        .stderr(predicate::str::contains("MAIN_PROG"));
    Ok(())
}

#[test]
fn verify_piped_karel() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tpkarel")?;
    let fd = File::open(Path::new("tests").join("karel").join("cell_data.kl"))?;
    cmd.arg("verify")
        .arg("-t").arg("karel")
        .stdin(Stdio::from(fd))
        .assert()
        .success()
        .stderr(predicate::str::contains("Syntax OK"))
        // not a console, so the source is passed along
        .stdout(predicate::str::contains("END cell_data"));
    Ok(())
}

#[test]
fn verify_reports_location() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("verify")
        .arg("-f").arg(Path::new("tests").join("karel").join("bad_syntax.kl"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("row 5"))
        .stderr(predicate::str::contains("Syntax"));
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("verify")
        .arg("-f").arg(Path::new("tests").join("tp").join("bad_syntax.ls"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("row 4 col 13"));
    Ok(())
}

#[test]
fn invalid_language() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("verify")
        .arg("-t").arg("basic")
        .arg("-f").arg(Path::new("tests").join("tp").join("main_prog.ls"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("basic"));
    Ok(())
}

#[test]
fn language_from_extension_required() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("main.txt");
    std::fs::write(&path,UNFORMATTED)?;
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("verify")
        .arg("-f").arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("UnknownFormat"));
    // explicit type overrides the extension
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("verify")
        .arg("-t").arg("tp")
        .arg("-f").arg(&path)
        .assert()
        .success();
    Ok(())
}

#[test]
fn format_listing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("test.ls");
    std::fs::write(&path,UNFORMATTED)?;
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("format")
        .arg("-f").arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("   1:  IF R[1]=1 THEN ;\n   1:    CALL A ;\n   1:  ENDIF ;\n"));
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("format")
        .arg("--tab-size").arg("4")
        .arg("-f").arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("   1:      CALL A ;\n"));
    Ok(())
}

#[test]
fn format_piped() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("test.ls");
    std::fs::write(&path,UNFORMATTED)?;
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("format")
        .stdin(Stdio::from(File::open(&path)?))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("/PROG  TEST\n/ATTR\n/MN\n"));
    Ok(())
}

#[test]
fn format_needs_sections() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("test.ls");
    std::fs::write(&path,"/PROG  TEST\n/MN\n   1:  END ;\n/END\n")?;
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("format")
        .arg("-f").arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotFormattable"));
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("format")
        .arg("-f").arg(Path::new("tests").join("karel").join("cell_data.kl"))
        .assert()
        .failure();
    Ok(())
}

#[test]
fn karel_symbols() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("symbols")
        .arg("-f").arg(Path::new("tests").join("karel").join("cell_data.kl"))
        .assert()
        .success()
        .stdout(predicate::str::contains("const\ttray_count\t4\t9"))
        .stdout(predicate::str::contains("  field\tx\tREAL\t13"))
        .stdout(predicate::str::contains("routine\tslot_free\tBOOLEAN\t31"))
        .stdout(predicate::str::contains("routine\tclear_tray\tfrom cell_util\t29"));
    Ok(())
}

#[test]
fn tp_symbols_with_header() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("symbols")
        .arg("--header")
        .arg("-f").arg(Path::new("tests").join("tp").join("main_prog.ls"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Main production cycle"))
        .stdout(predicate::str::contains("label\tLBL[1]\ttop\t24"));
    Ok(())
}

#[test]
fn shell_completions() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tpkarel")?;
    cmd.arg("completions")
        .arg("-s").arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("tpkarel"));
    Ok(())
}
