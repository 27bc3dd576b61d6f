//! The demo bookstore served by the `hyperres` binary.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use tracing::info;

use hyperres_base::HyperresResult;
use hyperres_engine::{
    BinaryFile, FieldValues, Lookup, PageItems, RegistryBuilder, Representor, ResourceRegistry,
    Routes,
};

#[derive(Debug, Clone)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub published: Option<DateTime<Utc>>,
    pub format: Format,
    pub author_id: u32,
}

#[derive(Debug, Clone)]
pub struct Format {
    pub pages: u32,
    pub hardcover: bool,
}

#[derive(Debug, Clone)]
pub struct Author {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Review {
    pub id: u32,
    pub isbn: String,
    pub rating: u8,
    pub text: String,
}

/// In-memory data behind the demo routes.
#[derive(Debug, Default)]
pub struct Bookstore {
    books: RwLock<Vec<Book>>,
    authors: RwLock<Vec<Author>>,
    reviews: RwLock<Vec<Review>>,
}

impl Bookstore {
    pub fn with_sample_data() -> Self {
        let date = |year, month, day| Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single();
        let store = Self::default();
        store.authors.write().extend([
            Author {
                id: 1,
                name: "Frank Herbert".to_string(),
            },
            Author {
                id: 2,
                name: "Ursula K. Le Guin".to_string(),
            },
        ]);
        store.books.write().extend([
            Book {
                isbn: "978-0441013593".to_string(),
                title: "Dune".to_string(),
                published: date(1965, 8, 1),
                format: Format {
                    pages: 896,
                    hardcover: false,
                },
                author_id: 1,
            },
            Book {
                isbn: "978-0441478125".to_string(),
                title: "The Left Hand of Darkness".to_string(),
                published: date(1969, 3, 1),
                format: Format {
                    pages: 304,
                    hardcover: true,
                },
                author_id: 2,
            },
        ]);
        store.reviews.write().push(Review {
            id: 1,
            isbn: "978-0441013593".to_string(),
            rating: 5,
            text: "Spice must flow.".to_string(),
        });
        store
    }

    fn author(&self, id: u32) -> Option<Author> {
        self.authors.read().iter().find(|author| author.id == id).cloned()
    }

    fn book(&self, isbn: &str) -> Option<Book> {
        self.books.read().iter().find(|book| book.isbn == isbn).cloned()
    }

    fn create_book(&self, values: &FieldValues) -> HyperresResult<Book> {
        let book = Book {
            isbn: values.require_string("isbn")?.to_string(),
            title: values.require_string("title")?.to_string(),
            published: None,
            format: Format {
                pages: values.number("pages").unwrap_or_default() as u32,
                hardcover: values.boolean("hardcover").unwrap_or_default(),
            },
            author_id: values.number("authorId").unwrap_or(1.0) as u32,
        };
        self.books.write().push(book.clone());
        info!(isbn = %book.isbn, "added book");
        Ok(book)
    }
}

fn book_representor(store: Arc<Bookstore>) -> HyperresResult<Representor> {
    let format = Representor::nested::<Format>()
        .number("pages", |format| Some(format.pages))
        .boolean("hardcover", |format| Some(format.hardcover));
    Representor::builder::<Book>(["Book", "CreativeWork"])
        .identifier(|book| book.isbn.clone())
        .string("isbn", |book| Some(book.isbn.clone()))
        .string("title", |book| Some(book.title.clone()))
        .date("published", |book| book.published)
        .nested("format", format, |book| Some(book.format.clone()))
        .link("license", "https://creativecommons.org/licenses/by/4.0/")
        .binary("cover", |book| {
            let svg = format!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="300"><text x="10" y="150">{}</text></svg>"#,
                book.title
            );
            Some(BinaryFile::new(svg, "image/svg+xml"))
        })
        .bidirectional_model::<Author>("author", "books", move |book| store.author(book.author_id))
        .build()
}

fn review_representor(store: Arc<Bookstore>) -> HyperresResult<Representor> {
    Representor::builder::<Review>(["Review"])
        .identifier(|review| review.id.to_string())
        .number("rating", |review| Some(review.rating))
        .string("text", |review| Some(review.text.clone()))
        .bidirectional_model::<Book>("book", "reviews", move |review| store.book(&review.isbn))
        .build()
}

/// Declare the bookstore resources and freeze them into a registry.
pub fn registry(store: Arc<Bookstore>) -> HyperresResult<ResourceRegistry> {
    let builder = RegistryBuilder::new();

    let (read, listed, created, deleted) = (store.clone(), store.clone(), store.clone(), store.clone());
    builder.register(
        "books",
        book_representor(store.clone())?,
        Routes::builder::<Book>()
            .create(move |_, values| created.create_book(values))
            .get_item(move |_, path| Ok(Lookup::from(read.book(path.id()))))
            .get_page(move |context, parent| {
                let author_id = parent.map(|parent| parent.id().to_string());
                let books: Vec<Book> = listed
                    .books
                    .read()
                    .iter()
                    .filter(|book| {
                        author_id
                            .as_deref()
                            .is_none_or(|id| book.author_id.to_string() == id)
                    })
                    .cloned()
                    .collect();
                Ok(PageItems::paginate(books, context.pagination()))
            })
            .delete(move |_, path| {
                let mut books = deleted.books.write();
                let before = books.len();
                books.retain(|book| book.isbn != path.id());
                Ok(Lookup::from((books.len() < before).then_some(())))
            })
            .build(),
    );

    let (read, listed) = (store.clone(), store.clone());
    builder.register(
        "authors",
        Representor::builder::<Author>(["Person"])
            .identifier(|author| author.id.to_string())
            .string("name", |author| Some(author.name.clone()))
            .build()?,
        Routes::builder::<Author>()
            .get_item(move |_, path| Ok(Lookup::from(read.author(path.parse_id()?))))
            .get_page(move |context, _| {
                let authors = listed.authors.read().clone();
                Ok(PageItems::paginate(authors, context.pagination()))
            })
            .build(),
    );

    let (read, listed) = (store.clone(), store.clone());
    builder.register(
        "reviews",
        review_representor(store)?,
        Routes::builder::<Review>()
            .get_item(move |_, path| {
                let id: u32 = path.parse_id()?;
                let review = read.reviews.read().iter().find(|review| review.id == id).cloned();
                Ok(Lookup::from(review))
            })
            .get_page(move |context, parent| {
                let reviews: Vec<Review> = listed
                    .reviews
                    .read()
                    .iter()
                    .filter(|review| parent.is_none_or(|parent| review.isbn == parent.id()))
                    .cloned()
                    .collect();
                Ok(PageItems::paginate(reviews, context.pagination()))
            })
            .build(),
    );

    builder.freeze()
}

#[cfg(test)]
mod tests {
    use hyperres_base::http::{HttpMethod, HttpRequest, HttpService, HttpStatusCode};
    use hyperres_engine::HypermediaService;
    use serde_json::Value;

    use super::*;

    fn service() -> HypermediaService {
        let registry = registry(Arc::new(Bookstore::with_sample_data())).unwrap();
        HypermediaService::builder(registry)
            .with_server_url("http://localhost:8080")
            .build()
            .unwrap()
    }

    fn get(path: &str) -> Value {
        let response = service()
            .handle_request(HttpRequest::new(HttpMethod::Get, path))
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::Ok, "{}", path);
        serde_json::from_slice(response.body().as_bytes()).unwrap()
    }

    #[test]
    fn test_book_document() {
        let book = get("/p/books/978-0441013593");
        assert_eq!(book["types"], serde_json::json!(["Book", "CreativeWork"]));
        assert_eq!(book["fields"]["published"], "1965-08-01T00:00:00Z");
        assert_eq!(
            book["fields"]["format"],
            serde_json::json!({"pages": 896, "hardcover": false})
        );
        assert_eq!(
            book["relatedCollections"]["reviews"],
            "http://localhost:8080/p/books/978-0441013593/reviews"
        );
    }

    #[test]
    fn test_back_references() {
        let books = get("/p/authors/2/books");
        assert_eq!(books["totalItems"], 1);
        let reviews = get("/p/books/978-0441013593/reviews");
        assert_eq!(reviews["members"][0]["fields"]["rating"], 5);
    }
}
