use std::fs;
use std::path::Path;

use deepsmiles_tokenizer::*;
use tempfile::TempDir;

fn write_input(dir: &TempDir, text: &str) -> std::path::PathBuf {
    let path = dir.path().join("input.smi");
    fs::write(&path, text).expect("Failed to write input file");
    path
}

fn run_to_string(config: &Config) -> String {
    run(config).expect("Run failed");
    fs::read_to_string(&config.output).expect("Failed to read output file")
}

fn config_in(dir: &TempDir, input: &Path, name: &str) -> Config {
    Config::new(input, dir.path().join(name))
}

#[test]
fn test_ethanol_end_to_end() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "CCO mol1\n");
    let output = run_to_string(&config_in(&dir, &input, "out.txt"));

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 1);
    let protected = protect_smiles("CCO").unwrap();
    let dsmi = smiles_to_deepsmiles(&protected).unwrap();
    assert_eq!(lines[0].replace(' ', ""), dsmi);
    assert_eq!(lines[0], "[CH3] [CH2] [OH]");
}

#[test]
fn test_same_seed_same_output() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "CC(=O)Nc1ccc(O)cc1 paracetamol\nCN1C=NC2=C1C(=O)N(C(=O)N2C)C caffeine\nCCO ethanol\n",
    );

    let mut first = config_in(&dir, &input, "first.txt");
    first.augment = 4;
    let mut second = config_in(&dir, &input, "second.txt");
    second.augment = 4;

    let first_output = run_to_string(&first);
    let second_output = run_to_string(&second);
    assert_eq!(first_output.lines().count(), 12);
    assert_eq!(first_output, second_output);
}

#[test]
fn test_variants_reconstruct_their_deepsmiles() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "c1ccccc1C(=O)[O-] benzoate\n");
    let mut config = config_in(&dir, &input, "out.txt");
    config.randomize = true;
    config.augment = 5;

    let output = run_to_string(&config);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 5);
    for line in lines {
        assert!(!line.contains("  "));
        assert_eq!(line.trim(), line);
        assert!(line.split(' ').any(|token| token == "[O-]"));
        assert_eq!(tokenize(&line.replace(' ', "")), line);
    }
}

#[test]
fn test_rand_flag_with_one_variant() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "CC(C)Cl a\nOCCN b\n");
    let mut config = config_in(&dir, &input, "out.txt");
    config.randomize = true;

    let output = run_to_string(&config);
    assert_eq!(output.lines().count(), 2);
}

#[test]
fn test_fragments_are_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "CCO ok\n[Na+].[Cl-] salt\n");
    let config = config_in(&dir, &input, "out.txt");

    let error = run(&config).unwrap_err();
    assert!(format!("{error:#}").contains("line 2"));
    assert!(error.downcast_ref::<TokenizeError>().is_some());
}

#[test]
fn test_fragments_are_rejected_when_randomized() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "CCO ok\n[Na+].[Cl-] salt\n");
    let mut config = config_in(&dir, &input, "out.txt");
    config.randomize = true;
    config.augment = 3;

    let error = run(&config).unwrap_err();
    assert!(format!("{error:#}").contains("line 2"));
    assert!(matches!(
        error.downcast_ref::<TokenizeError>(),
        Some(TokenizeError::MultiFragment(_))
    ));
}

#[test]
fn test_blank_line_is_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "CCO a\n\nCCC b\n");
    let config = config_in(&dir, &input, "out.txt");

    let error = run(&config).unwrap_err();
    assert!(format!("{error:#}").contains("line 2"));
    assert_eq!(
        error.downcast_ref::<RecordError>(),
        Some(&RecordError::FieldCount(0))
    );
}

#[test]
fn test_missing_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "CCO\n");
    let config = config_in(&dir, &input, "out.txt");

    let error = run(&config).unwrap_err();
    assert_eq!(
        error.downcast_ref::<RecordError>(),
        Some(&RecordError::FieldCount(1))
    );
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, &dir.path().join("missing.smi"), "out.txt");
    assert!(run(&config).is_err());
}
