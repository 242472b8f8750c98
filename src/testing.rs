//! Testing helpers.

use assert_float_eq::*;

pub fn assert_slice_f64_relative(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, &expected) in expected.iter().enumerate() {
        let actual = actual[index];
        if actual != expected {
            assert_float_relative_eq!(expected, actual, epsilon);
        }
    }
}

pub fn assert_slice_f64_absolute(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (&expected, &actual) in expected.iter().zip(actual) {
        assert_float_absolute_eq!(expected, actual, epsilon);
    }
}

/// Writes a match CSV with the standard header and the given data lines.
pub fn write_matches(path: &std::path::Path, lines: &[&str]) {
    let mut contents = String::from("Temporada,Jornada,Local,Visitante,Local_gol,Visitante_gol\n");
    for line in lines {
        contents.push_str(line);
        contents.push('\n');
    }
    std::fs::write(path, contents).unwrap();
}
