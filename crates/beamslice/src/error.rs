// Error handling follows the same split as the rest of the crate: the
// `beamslice_nostd_internal` crate reports failures as `&'static str`
// (it can't allocate), and this crate wraps those strings into a proper
// error type alongside the errors that originate out here.
//
// The opaque-struct-plus-private-kind layout is modeled on the jiff
// crate's discussion of error-type design.

#[derive(Debug)]
pub struct Error {
    // we may eventually want to expose this (or track a cause)
    kind: ErrorKind,
}

/// The underlying internal error type
#[non_exhaustive]
#[derive(Clone, Debug)]
enum ErrorKind {
    /// An error that occurs when an integer lies outside of the acceptable
    /// range of values
    IntegerRange(IntegerRangeError),
    /// An error that occurs within `beamslice_nostd_internal`
    ///
    /// This wraps the stringly errors that are pervasive within
    /// `beamslice_nostd_internal`
    InternalAdHoc(InternalAdHocError),
    /// An error that occurs when a per-particle output buffer has the
    /// wrong length
    RecordLength(RecordLengthError),
    /// An error that occurs when a problematic slicing configuration is
    /// specified
    SlicerConfig(SlicerConfigError),
    /// An error that occurs when a binned statepack has the wrong shape
    StatePackShape(StatePackShapeError),
}

// define constructor methods for Error
impl Error {
    /// produce an error indicating that an integer lies outside the
    /// acceptable range of values
    pub(crate) fn integer_range(
        description: &'static str,
        actual: i64,
        min_val: i64,
        max_val: i64,
    ) -> Self {
        Error {
            kind: ErrorKind::IntegerRange(IntegerRangeError {
                description,
                actual,
                min_val,
                max_val,
            }),
        }
    }

    /// wraps an internal error string
    pub(crate) fn internal_adhoc(message: &'static str) -> Self {
        Error {
            kind: ErrorKind::InternalAdHoc(InternalAdHocError(message)),
        }
    }

    /// produce an error indicating that a per-particle output buffer has
    /// the wrong length
    pub(crate) fn record_length(name: &'static str, expected: u64, actual: u64) -> Self {
        Error {
            kind: ErrorKind::RecordLength(RecordLengthError {
                name,
                expected,
                actual,
            }),
        }
    }

    /// produce an error indicating that a problematic slicing
    /// configuration was specified
    pub(crate) fn slicer_config(who: &'static str, what: String) -> Self {
        Error {
            kind: ErrorKind::SlicerConfig(SlicerConfigError { who, what }),
        }
    }

    /// produce an error indicating that a binned statepack has the wrong
    /// shape
    pub(crate) fn statepack_shape(
        expected_n_states: u64,
        expected_accum_size: u64,
        actual_n_states: u64,
        actual_accum_size: u64,
    ) -> Self {
        Error {
            kind: ErrorKind::StatePackShape(StatePackShapeError {
                expected_n_states,
                expected_accum_size,
                actual_n_states,
                actual_accum_size,
            }),
        }
    }
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for ErrorKind {}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            ErrorKind::IntegerRange(ref err) => err.fmt(f),
            ErrorKind::InternalAdHoc(ref err) => err.fmt(f),
            ErrorKind::RecordLength(ref err) => err.fmt(f),
            ErrorKind::SlicerConfig(ref err) => err.fmt(f),
            ErrorKind::StatePackShape(ref err) => err.fmt(f),
        }
    }
}

/// An error that occurs when an integer lies outside of the acceptable
/// range of values
#[derive(Clone, Debug)]
struct IntegerRangeError {
    description: &'static str,
    actual: i64,
    min_val: i64,
    max_val: i64,
}

impl std::error::Error for IntegerRangeError {}

impl core::fmt::Display for IntegerRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} has a value of {}. The value should be no less than {} and \
             not exceed {}",
            self.description, self.actual, self.min_val, self.max_val
        )
    }
}

/// Wraps the string errors reported by `beamslice_nostd_internal`
#[derive(Clone)]
struct InternalAdHocError(&'static str);

impl std::error::Error for InternalAdHocError {}

impl core::fmt::Display for InternalAdHocError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::fmt::Debug for InternalAdHocError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.0, f)
    }
}

/// An error that occurs when a per-particle output buffer has the wrong
/// length
#[derive(Clone, Debug)]
struct RecordLengthError {
    name: &'static str,
    expected: u64,
    actual: u64,
}

impl std::error::Error for RecordLengthError {}

impl core::fmt::Display for RecordLengthError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "the {} buffer holds {} entries, but it requires one entry per \
             particle ({} entries)",
            self.name, self.actual, self.expected
        )
    }
}

/// An error that occurs when a problematic slicing configuration is
/// specified
#[derive(Clone, Debug)]
struct SlicerConfigError {
    who: &'static str,
    what: String,
}

impl std::error::Error for SlicerConfigError {}

impl core::fmt::Display for SlicerConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let who = self.who;
        let what = self.what.as_str();
        write!(f, "problem with {who}: {what}")
    }
}

/// An error that occurs when a binned statepack has the wrong shape
#[derive(Clone, Debug)]
struct StatePackShapeError {
    expected_n_states: u64,
    expected_accum_size: u64,
    actual_n_states: u64,
    actual_accum_size: u64,
}

impl std::error::Error for StatePackShapeError {}

impl core::fmt::Display for StatePackShapeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "binned statepack has {} states & each state holds {} values. \
             It should have {} states, with {} entries per state",
            self.actual_n_states,
            self.actual_accum_size,
            self.expected_n_states,
            self.expected_accum_size
        )
    }
}
