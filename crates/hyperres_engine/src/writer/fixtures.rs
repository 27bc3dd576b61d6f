//! A small bookstore registry shared by the writer tests.

use crate::model::{Lookup, PageItems};
use crate::registry::{RegistryBuilder, ResourceRegistry};
use crate::representor::{BinaryFile, Representor};
use crate::routes::Routes;

#[derive(Debug, Clone)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub author: Author,
    pub publisher: Publisher,
}

#[derive(Debug, Clone)]
pub struct Author {
    pub id: u32,
    pub name: String,
}

/// Never registered, so relations to it are left out of documents.
#[derive(Debug, Clone)]
pub struct Publisher {
    pub name: String,
}

pub fn book() -> Book {
    Book {
        isbn: "978-0441013593".to_string(),
        title: "Dune".to_string(),
        subtitle: None,
        author: Author {
            id: 1,
            name: "Frank Herbert".to_string(),
        },
        publisher: Publisher {
            name: "Ace".to_string(),
        },
    }
}

pub fn bookstore() -> ResourceRegistry {
    let books = Representor::builder::<Book>(["Book"])
        .identifier(|book| book.isbn.clone())
        .string("isbn", |book| Some(book.isbn.clone()))
        .string("title", |book| Some(book.title.clone()))
        .string("subtitle", |book| book.subtitle.clone())
        .link("license", "https://creativecommons.org/licenses/by/4.0/")
        .binary("cover", |_| Some(BinaryFile::new(b"GIF89a".to_vec(), "image/gif")))
        .bidirectional_model::<Author>("author", "books", |book| Some(book.author.clone()))
        .related_model::<Publisher>("publisher", |book| Some(book.publisher.clone()))
        .build()
        .unwrap();
    let authors = Representor::builder::<Author>(["Person"])
        .identifier(|author| author.id.to_string())
        .string("name", |author| Some(author.name.clone()))
        .build()
        .unwrap();

    let builder = RegistryBuilder::new();
    builder.register(
        "books",
        books,
        Routes::builder::<Book>()
            .get_item(|_, path| {
                let book = book();
                Ok(Lookup::from((book.isbn == path.id()).then_some(book)))
            })
            .get_page(|context, _| Ok(PageItems::paginate(vec![book()], context.pagination())))
            .build(),
    );
    builder.register("authors", authors, Routes::builder::<Author>().build());
    builder.freeze().unwrap()
}
