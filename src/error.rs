use crate::matrix::Matrix;

/// Alias for a `Result<T, geoconform::error::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents all possible errors that can occur by this crate.
///
/// Verification entry points return [`ErrorImpl::TransformFailure`] or
/// [`ErrorImpl::DerivativeFailure`] when a computed value is off tolerance,
/// and [`ErrorImpl::Unsupported`] when the implementation under test declines
/// an optional capability; the latter is a skip, see [`Error::is_skip`].
#[derive(Debug)]
pub struct Error {
    pub err: Box<ErrorImpl>,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.err)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl Error {
    /// Returns a error kind.
    pub fn kind(&self) -> &ErrorImpl {
        &self.err
    }

    /// Returns `true` if the error must be reported as a skipped test
    /// rather than a failure.
    ///
    /// # Example
    ///
    /// ```
    /// # use geoconform::*;
    /// let factory = DefaultMathTransformFactory::new();
    /// let err = factory.default_parameters("Lambert Azimuthal Equal Area").unwrap_err();
    /// assert!(err.is_skip());
    /// ```
    pub fn is_skip(&self) -> bool {
        matches!(*self.err, ErrorImpl::Unsupported { .. })
    }

    /// Returns `true` if the error is a coordinate or derivative comparison failure.
    pub fn is_comparison_failure(&self) -> bool {
        matches!(
            *self.err,
            ErrorImpl::TransformFailure(_) | ErrorImpl::DerivativeFailure(_)
        )
    }
}

impl Error {
    pub(crate) fn new_unsupported(what: impl Into<String>) -> Self {
        Self {
            err: Box::new(ErrorImpl::Unsupported { what: what.into() }),
        }
    }

    pub(crate) fn new_transform_failure(failure: TransformFailure) -> Self {
        Self {
            err: Box::new(ErrorImpl::TransformFailure(failure)),
        }
    }

    pub(crate) fn new_derivative_failure(failure: DerivativeFailure) -> Self {
        Self {
            err: Box::new(ErrorImpl::DerivativeFailure(failure)),
        }
    }

    pub(crate) fn new_contract_violation(message: impl Into<String>) -> Self {
        Self {
            err: Box::new(ErrorImpl::ContractViolation {
                message: message.into(),
            }),
        }
    }

    pub(crate) fn new_configuration(message: impl Into<String>) -> Self {
        Self {
            err: Box::new(ErrorImpl::Configuration {
                message: message.into(),
            }),
        }
    }

    pub(crate) fn new_invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            err: Box::new(ErrorImpl::InvalidParameter {
                name: name.into(),
                reason: reason.into(),
            }),
        }
    }

    pub(crate) fn new_parameter_not_found(name: impl Into<String>) -> Self {
        Self {
            err: Box::new(ErrorImpl::ParameterNotFound { name: name.into() }),
        }
    }

    pub(crate) fn new_no_such_sample(crs: u32) -> Self {
        Self {
            err: Box::new(ErrorImpl::NoSuchSample { crs }),
        }
    }

    pub(crate) fn new_not_convergent(criteria: f64, iteration: usize) -> Self {
        Self {
            err: Box::new(ErrorImpl::NotConvergent {
                criteria,
                iteration,
            }),
        }
    }

    pub(crate) fn new_parse_configuration(
        lineno: usize,
        kind: ParseConfigurationKind,
        line: impl Into<String>,
    ) -> Self {
        Self {
            err: Box::new(ErrorImpl::ParseConfiguration {
                kind,
                lineno,
                line: line.into(),
            }),
        }
    }
}

#[derive(Debug)]
pub enum ErrorImpl {
    /// The implementation declined an optional operation, method or dimensionality.
    Unsupported {
        /// Description of the declined capability
        what: String,
    },
    /// Transformed coordinates differ from the expected ones by more than the tolerance.
    TransformFailure(TransformFailure),
    /// An analytical derivative differs from its approximation by more than the tolerance.
    DerivativeFailure(DerivativeFailure),
    /// A caller-observable invariant of the implementation is broken,
    /// e.g. wrong dimension or mutated source buffer.
    ContractViolation {
        /// Explanation
        message: String,
    },
    /// The test case itself is misconfigured.
    Configuration {
        /// Explanation
        message: String,
    },
    /// Parameter value outside of its domain or of the wrong type.
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Explanation
        reason: String,
    },
    /// No parameter of that name in the group.
    ParameterNotFound {
        /// Parameter name
        name: String,
    },
    /// No sample points for the CRS code.
    NoSuchSample {
        /// The EPSG code
        crs: u32,
    },
    /// Error is still high even iteration exhausted
    NotConvergent {
        /// Error cirteria
        criteria: f64,
        /// Max iteration
        iteration: usize,
    },
    /// Invalid line found in properties-formatted configuration.
    ParseConfiguration {
        /// Kind of component
        kind: ParseConfigurationKind,
        /// Line no. of the data
        lineno: usize,
        /// The offending line
        line: String,
    },
}

/// Precision of the arrays involved in a coordinate comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// At least one operand was stored as `f32`.
    Single,
    /// Both operands were stored as `f64`.
    Double,
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Precision::Single => "f32",
            Precision::Double => "f64",
        };
        f.write_str(s)
    }
}

/// Details of a coordinate comparison failure.
#[derive(Debug, Clone)]
pub struct TransformFailure {
    /// Caller-supplied context
    pub message: String,
    /// Index of the failing point, offset by the reported index
    pub point: usize,
    /// Ordinate index of the first mismatch
    pub ordinate: usize,
    /// The expected tuple
    pub expected: Vec<f64>,
    /// The actual tuple, before normalization
    pub actual: Vec<f64>,
    /// Absolute difference at the mismatching ordinate
    pub delta: f64,
    /// Tolerance in effect at the mismatching ordinate
    pub tolerance: f64,
    /// Precision used for reporting [`delta`](TransformFailure::delta)
    pub precision: Precision,
    /// Textual form of the transform under test, if any
    pub transform: Option<String>,
}

impl TransformFailure {
    /// Returns `delta / tolerance`.
    ///
    /// A zero delta, as for `0.0` against `-0.0`, gives `0.0`. A positive
    /// delta over a zero tolerance gives infinity, and a NaN delta gives NaN.
    pub fn ratio(&self) -> f64 {
        if self.delta == 0.0 {
            0.0
        } else {
            self.delta / self.tolerance
        }
    }
}

impl std::fmt::Display for TransformFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.message)?;
        write!(
            f,
            "DirectPosition{}D[{}]: expected (",
            self.expected.len(),
            self.point
        )?;
        write_tuple(f, &self.expected)?;
        f.write_str(") but got (")?;
        write_tuple(f, &self.actual)?;
        writeln!(f, ").")?;
        match self.precision {
            Precision::Single => write!(
                f,
                "the delta at ordinate {} is {:?}",
                self.ordinate, self.delta as f32
            )?,
            Precision::Double => write!(
                f,
                "the delta at ordinate {} is {:?}",
                self.ordinate, self.delta
            )?,
        }
        write!(
            f,
            " (tolerance {:?}, ratio {:?})",
            self.tolerance,
            self.ratio()
        )?;
        if let Some(transform) = &self.transform {
            write!(f, "\ntransform: {transform}")?;
        }
        Ok(())
    }
}

/// Details of a derivative comparison failure.
#[derive(Debug, Clone)]
pub struct DerivativeFailure {
    /// Caller-supplied context
    pub message: String,
    /// Row (target dimension) of the mismatch
    pub row: usize,
    /// Column (source dimension) of the mismatch
    pub column: usize,
    /// Expected element
    pub expected: f64,
    /// Actual element
    pub actual: f64,
    /// Tolerance in effect at the element
    pub tolerance: f64,
    /// The expected matrix, possibly approximative
    pub expected_matrix: Matrix,
    /// The actual matrix
    pub actual_matrix: Matrix,
    /// Textual form of the transform under test, if any
    pub transform: Option<String>,
}

impl DerivativeFailure {
    /// Returns the absolute difference between expected and actual element.
    pub fn delta(&self) -> f64 {
        (self.expected - self.actual).abs()
    }
}

impl std::fmt::Display for DerivativeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.message)?;
        writeln!(
            f,
            "Matrix({},{}): expected {:?} but got {:?} (a difference of {:?}, tolerance {:?})",
            self.row,
            self.column,
            self.expected,
            self.actual,
            self.delta(),
            self.tolerance
        )?;
        writeln!(f, "expected matrix (may be approximative):")?;
        write!(f, "{}", self.expected_matrix)?;
        writeln!(f, "actual matrix:")?;
        write!(f, "{}", self.actual_matrix)?;
        if let Some(transform) = &self.transform {
            write!(f, "transform: {transform}")?;
        }
        Ok(())
    }
}

fn write_tuple(f: &mut std::fmt::Formatter<'_>, values: &[f64]) -> std::fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i != 0 {
            f.write_str(", ")?;
        }
        write!(f, "{v:?}")?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseConfigurationKind {
    Separator,
    Key,
    Value,
}

impl std::fmt::Display for ParseConfigurationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParseConfigurationKind::Separator => "separator",
            ParseConfigurationKind::Key => "key",
            ParseConfigurationKind::Value => "value",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for ErrorImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ErrorImpl::Unsupported { what } => write!(f, "unsupported: {what}"),
            ErrorImpl::TransformFailure(failure) => write!(f, "{failure}"),
            ErrorImpl::DerivativeFailure(failure) => write!(f, "{failure}"),
            ErrorImpl::ContractViolation { message } => {
                write!(f, "contract violation: {message}")
            }
            ErrorImpl::Configuration { message } => write!(f, "invalid test case: {message}"),
            ErrorImpl::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter '{name}': {reason}")
            }
            ErrorImpl::ParameterNotFound { name } => write!(f, "parameter not found: '{name}'"),
            ErrorImpl::NoSuchSample { crs } => write!(f, "no sample points for EPSG:{crs}"),
            ErrorImpl::NotConvergent {
                criteria,
                iteration,
            } => write!(
                f,
                "error is still higher than {criteria:?} even exhaust {iteration:?} iterations"
            ),
            ErrorImpl::ParseConfiguration { kind, lineno, line } => {
                write!(f, "invalid {kind}: line {lineno:?}, '{line}'")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip() {
        assert!(Error::new_unsupported("Polyconic").is_skip());
        assert!(!Error::new_contract_violation("wrong dimension").is_skip());
        assert!(!Error::new_configuration("no deltas").is_comparison_failure());
    }

    #[test]
    fn test_transform_failure_display() {
        let failure = TransformFailure {
            message: "Unexpected transform result.".to_string(),
            point: 3,
            ordinate: 1,
            expected: vec![1.0, 2.0],
            actual: vec![1.0, 2.5],
            delta: 0.5,
            tolerance: 0.25,
            precision: Precision::Double,
            transform: None,
        };
        assert_eq!(failure.ratio(), 2.0);
        assert_eq!(
            failure.to_string(),
            "Unexpected transform result.\n\
             DirectPosition2D[3]: expected (1.0, 2.0) but got (1.0, 2.5).\n\
             the delta at ordinate 1 is 0.5 (tolerance 0.25, ratio 2.0)"
        );
    }

    #[test]
    fn test_ratio() {
        let mut failure = TransformFailure {
            message: "Source coordinate has been modified.".to_string(),
            point: 0,
            ordinate: 0,
            expected: vec![0.0],
            actual: vec![-0.0],
            delta: 0.0,
            tolerance: 0.0,
            precision: Precision::Double,
            transform: None,
        };
        assert_eq!(failure.ratio(), 0.0);
        assert!(failure.to_string().ends_with("(tolerance 0.0, ratio 0.0)"));

        failure.delta = 1.0;
        assert_eq!(failure.ratio(), f64::INFINITY);
        failure.delta = f64::NAN;
        assert!(failure.ratio().is_nan());
    }

    #[test]
    fn test_parse_display() {
        let e = Error::new_parse_configuration(4, ParseConfigurationKind::Key, "foo = true");
        assert_eq!(e.to_string(), "invalid key: line 4, 'foo = true'");
    }
}
