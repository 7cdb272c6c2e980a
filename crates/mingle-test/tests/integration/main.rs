mod helpers;

mod categories;
mod occurrences;
mod participants;
