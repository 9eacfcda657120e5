//! The Star Wars API catalogue: upstream location, operations and cache
//! policies used by the character browser.

use crate::client::{FieldPolicy, KeyArgs, Operation, TypePolicies, merge_connection};

/// Public SWAPI GraphQL endpoint the proxy forwards to by default.
pub const SWAPI_GRAPHQL_URL: &str = "https://swapi-graphql.netlify.app/.netlify/functions/index";

/// Number of people requested per page.
pub const PAGE_SIZE: u32 = 20;

/// Root field holding the paginated list of people.
pub const ALL_PEOPLE_FIELD: &str = "allPeople";

pub const ALL_PEOPLE: &str = r"query AllPeople($first: Int, $after: String) {
  allPeople(first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    edges {
      node {
        id
        name
        birthYear
        species { name }
        homeworld { name }
        filmConnection { edges { node { id title } } }
      }
    }
  }
}";

pub const PERSON_DETAILS: &str = r"query Person($id: ID!) {
  person(id: $id) {
    id
    name
    birthYear
    eyeColor
    hairColor
    height
    mass
    species { name classification language }
    homeworld { name diameter population climates terrains }
    filmConnection { edges { node { id title releaseDate } } }
  }
}";

/// First page of the people list.
#[must_use]
pub fn all_people(first: u32) -> Operation {
    Operation::new(ALL_PEOPLE).with_variable("first", first)
}

/// Detail view of one person.
#[must_use]
pub fn person(id: &str) -> Operation {
    Operation::new(PERSON_DETAILS).with_variable("id", id)
}

/// Cache policies for the browser: every page of `allPeople` accumulates
/// into one entry regardless of cursor.
#[must_use]
pub fn type_policies() -> TypePolicies {
    TypePolicies::new().field(
        ALL_PEOPLE_FIELD,
        FieldPolicy::new()
            .key_args(KeyArgs::None)
            .merge(merge_connection),
    )
}
