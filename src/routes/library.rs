//! `library` route: authors and books
//!
//! Every endpoint requires access level 1. Lookups of missing records are
//! reported to the caller verbatim.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{ApiError, EndpointResult, Route};
use crate::models::{Author, Book};
use crate::observability::LogLevel;
use crate::storage::{field_filter, id_filter, Filter, Model, RecordId, Repository};

use super::{params, RouteServices};

const LIBRARY_LEVEL: i64 = 1;

#[derive(Debug, Deserialize)]
struct NameParams {
    name: Value,
}

#[derive(Debug, Deserialize)]
struct AddAuthorParams {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IdParams {
    id: RecordId,
}

#[derive(Debug, Deserialize)]
struct GetBookParams {
    book_name: Option<Value>,
    author_name: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AddBookParams {
    name: String,
    price: i64,
    author_name: Option<String>,
    author_id: Option<RecordId>,
}

/// Repositories the library endpoints work on
#[derive(Clone)]
struct Library {
    authors: Repository<Author>,
    books: Repository<Book>,
}

pub fn route(services: &RouteServices) -> Route {
    let library = Library {
        authors: Repository::new(services.main.clone()),
        books: Repository::new(services.main.clone()),
    };
    let mut route = Route::new("library");

    let lib = library.clone();
    route
        .endpoint("get_author", move |_, p| lib.get_author(params(p)?))
        .schema(json!({
            "type": "object",
            "properties": {"name": {"type": ["string", "array"]}},
            "required": ["name"]
        }))
        .min_level(LIBRARY_LEVEL);

    let lib = library.clone();
    route
        .endpoint("add_author", move |_, p| lib.add_author(params(p)?))
        .schema(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        }))
        .min_level(LIBRARY_LEVEL);

    let lib = library.clone();
    route
        .endpoint("delete_author", move |_, p| lib.delete_author(params(p)?))
        .schema(id_schema())
        .min_level(LIBRARY_LEVEL);

    let lib = library.clone();
    route
        .endpoint("get_book", move |_, p| lib.get_book(params(p)?))
        .schema(json!({
            "type": "object",
            "properties": {
                "book_name": {"type": ["string", "array"]},
                "author_name": {"type": ["string", "array"]}
            },
            "anyOf": [
                {"required": ["book_name"]},
                {"required": ["author_name"]}
            ]
        }))
        .min_level(LIBRARY_LEVEL);

    let lib = library.clone();
    route
        .endpoint("add_book", move |_, p| lib.add_book(params(p)?))
        .schema(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "price": {"type": "integer"},
                "author_name": {"type": "string"},
                "author_id": {"type": ["integer", "string"]}
            },
            "oneOf": [
                {"required": ["name", "price", "author_name"]},
                {"required": ["name", "price", "author_id"]}
            ]
        }))
        .min_level(LIBRARY_LEVEL);

    let lib = library;
    route
        .endpoint("delete_book", move |_, p| lib.delete_book(params(p)?))
        .schema(id_schema())
        .min_level(LIBRARY_LEVEL);

    route
}

fn id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"id": {"type": ["integer", "string"]}},
        "required": ["id"]
    })
}

impl Library {
    fn get_author(&self, p: NameParams) -> EndpointResult {
        let authors = self.authors_named(&p.name)?;
        Ok(outputs(&authors))
    }

    fn add_author(&self, p: AddAuthorParams) -> EndpointResult {
        let mut author = Author::new(p.name);
        self.authors.save(&mut author)?;
        Ok(author.to_output())
    }

    fn delete_author(&self, p: IdParams) -> EndpointResult {
        let author = self
            .authors
            .find_one(&id_filter(&p.id))?
            .ok_or_else(|| missing(format!("Author with id {} does not exist", p.id)))?;
        self.authors.delete(&author)?;
        Ok(Value::Null)
    }

    fn get_book(&self, p: GetBookParams) -> EndpointResult {
        let mut filter = Filter::new();
        if let Some(book_name) = p.book_name {
            filter.insert("name".to_string(), book_name);
        }
        if let Some(author_name) = p.author_name {
            let ids: Vec<Value> = self
                .authors_named(&author_name)?
                .iter()
                .filter_map(|a| a.id().map(RecordId::to_value))
                .collect();
            filter.insert("author_id".to_string(), Value::Array(ids));
        }

        let books = self.books.find(&filter)?;
        Ok(outputs(&books))
    }

    fn add_book(&self, p: AddBookParams) -> EndpointResult {
        let author = match (p.author_id, p.author_name) {
            (Some(id), _) => self
                .authors
                .find_one(&id_filter(&id))?
                .ok_or_else(|| missing(format!("Author with id {} does not exist", id)))?,
            (None, Some(name)) => self
                .authors
                .find_one(&field_filter("name", name.as_str()))?
                .ok_or_else(|| missing(format!("Author with name {} does not exist", name)))?,
            (None, None) => {
                return Err(ApiError::invalid("Book author is not specified").into());
            }
        };

        let author_id = author
            .id
            .ok_or_else(|| ApiError::internal("Stored author has no identifier"))?;
        let mut book = Book::new(p.name, author_id, p.price);
        self.books.save(&mut book)?;
        Ok(book.to_output())
    }

    fn delete_book(&self, p: IdParams) -> EndpointResult {
        let book = self
            .books
            .find_one(&id_filter(&p.id))?
            .ok_or_else(|| missing(format!("Book with id {} does not exist", p.id)))?;
        self.books.delete(&book)?;
        Ok(Value::Null)
    }

    /// Authors matching one name or any of a list of names
    fn authors_named(&self, name: &Value) -> Result<Vec<Author>, ApiError> {
        let found = self
            .authors
            .find(&field_filter("name", name.clone()))
            .map_err(|e| ApiError::internal(format!("Author lookup failed: {}", e)))?;
        if found.is_empty() {
            return Err(missing(format!(
                "Author with name {} does not exist",
                describe(name)
            )));
        }
        Ok(found)
    }
}

fn missing(message: String) -> ApiError {
    ApiError::invalid(message).with_level(LogLevel::Info)
}

fn outputs<M: Model>(models: &[M]) -> Value {
    Value::Array(models.iter().map(Model::to_output).collect())
}

/// Renders a name filter for messages: `Tolkien` or `Tolkien, Pratchett`
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(describe).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(describe(&json!("Tolkien")), "Tolkien");
        assert_eq!(describe(&json!(["Tolkien", "Pratchett"])), "Tolkien, Pratchett");
        assert_eq!(describe(&json!(3)), "3");
    }
}
