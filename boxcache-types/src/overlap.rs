use crate::path::TypedPath;
use failure::Fail;
use std::collections::BTreeSet;
use std::fmt;

/// Declared input/output/temp-directory name sets are not disjoint (component G).
#[derive(Debug, Fail)]
pub enum OverlapError {
    /// A name was declared as both an input and an output.
    InputOutput(BTreeSet<String>),
    /// A name was declared as both an input and a temp directory.
    InputTemp(BTreeSet<String>),
    /// A name was declared as both an output and a temp directory.
    OutputTemp(BTreeSet<String>),
}

impl fmt::Display for OverlapError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (label, names) = match self {
            OverlapError::InputOutput(n) => ("Input files and output files", n),
            OverlapError::InputTemp(n) => ("Input files and temp directories", n),
            OverlapError::OutputTemp(n) => ("Output files and temp directories", n),
        };
        write!(f, "{} overlap for {}", label, python_set_repr(names))
    }
}

fn python_set_repr(names: &BTreeSet<String>) -> String {
    let joined = names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", joined)
}

fn names(paths: &[&TypedPath]) -> BTreeSet<String> {
    paths
        .iter()
        .map(|p| p.as_boxed().to_string_lossy().into_owned())
        .collect()
}

/// Fails if any pair of the three declared name sets intersects. Checked, in order,
/// input-vs-output, input-vs-temp, output-vs-temp, matching the message each scenario expects.
pub(crate) fn validate(
    inputs: &[&TypedPath],
    outputs: &[&TypedPath],
    temp_dirs: &[&TypedPath],
) -> Result<(), OverlapError> {
    let in_names = names(inputs);
    let out_names = names(outputs);
    let temp_names = names(temp_dirs);

    let in_out: BTreeSet<String> = in_names.intersection(&out_names).cloned().collect();
    if !in_out.is_empty() {
        return Err(OverlapError::InputOutput(in_out));
    }
    let in_temp: BTreeSet<String> = in_names.intersection(&temp_names).cloned().collect();
    if !in_temp.is_empty() {
        return Err(OverlapError::InputTemp(in_temp));
    }
    let out_temp: BTreeSet<String> = out_names.intersection(&temp_names).cloned().collect();
    if !out_temp.is_empty() {
        return Err(OverlapError::OutputTemp(out_temp));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_sets_pass() {
        let a = TypedPath::input("a").unwrap();
        let b = TypedPath::output("b").unwrap();
        let c = TypedPath::temp_dir("c").unwrap();
        assert!(validate(&[&a], &[&b], &[&c]).is_ok());
    }

    #[test]
    fn input_output_overlap_is_reported() {
        let a = TypedPath::input("foo.c").unwrap();
        let b = TypedPath::output("foo.c").unwrap();
        let err = validate(&[&a], &[&b], &[]).unwrap_err();
        assert_eq!(
            format!("{}", err),
            "Input files and output files overlap for {'foo.c'}"
        );
    }

    #[test]
    fn input_temp_overlap_is_reported_before_output_temp() {
        let a = TypedPath::input("x").unwrap();
        let b = TypedPath::output("x").unwrap();
        let t = TypedPath::temp_dir("x").unwrap();
        // input/output overlap is detected first, even though all three collide on "x"
        let err = validate(&[&a], &[&b], &[&t]).unwrap_err();
        assert!(matches!(err, OverlapError::InputOutput(_)));
    }
}
