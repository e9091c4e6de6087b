use {
    itertools::Itertools,
    std::{borrow::Cow, fmt},
    tap::{Pipe, Tap},
};

/// Separator between the segments of a container key.
pub const JOIN_TAG: &str = ".";
/// Segment holding the length of a sequence, e.g. `server.ports.#`.
pub const COUNT_TAG: &str = "#";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment<'a> {
    Field(Cow<'a, str>),
    Idx(usize),
    Count,
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(field) => f.write_str(field),
            Segment::Idx(idx) => write!(f, "{idx}"),
            Segment::Count => f.write_str(COUNT_TAG),
        }
    }
}

impl<'a> Segment<'a> {
    pub fn field(field: &'a str) -> Self {
        field.pipe(Cow::Borrowed).pipe(Segment::Field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct KeyPath<'a>(Vec<Segment<'a>>);

impl<'a> KeyPath<'a> {
    pub fn join(&self, segment: Segment<'a>) -> Self {
        self.clone().tap_mut(|p| p.0.push(segment))
    }
}

impl fmt::Display for KeyPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(JOIN_TAG))
    }
}

pub fn boxed_iter<'a, T, I>(iter: I) -> Box<dyn Iterator<Item = T> + 'a>
where
    T: 'a,
    I: Iterator<Item = T> + 'a,
{
    Box::new(iter)
}

pub mod flatten;
pub mod keys;
