/* 📖 # Why test the whole service in one place?

These tests drive a small bookstore through HypermediaService::handle_request,
exactly as the HTTP server does. They cover how representors, routes, the
registry and the writers fit together: the unit tests next to each module only
see one of them at a time.
*/

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use expect_test::expect;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::{Value, json};

    use hyperres_base::http::{HttpMethod, HttpRequest, HttpResponse, HttpService, HttpStatusCode};

    use crate::{
        BinaryFile, HostHeaderServerUrl, HypermediaService, Lookup, PageItems, RegistryBuilder,
        Representor, Routes, ServerConfig,
    };

    const DUNE: &str = "978-0441013593";

    #[derive(Debug, Clone)]
    struct Book {
        isbn: String,
        title: String,
        year: Option<u32>,
        author_id: u32,
        publisher: Option<String>,
    }

    #[derive(Debug, Clone)]
    struct Author {
        id: u32,
        name: String,
    }

    /// Never registered: relations to it must not show up anywhere.
    #[derive(Debug, Clone)]
    struct Publisher(String);

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct NewBook {
        isbn: String,
        title: String,
        author_id: u32,
        year: Option<u32>,
    }

    struct Store {
        books: Mutex<Vec<Book>>,
        authors: Vec<Author>,
    }

    impl Store {
        fn new() -> Self {
            let book = |isbn: &str, title: &str, year: u32, author_id: u32| Book {
                isbn: isbn.to_string(),
                title: title.to_string(),
                year: Some(year),
                author_id,
                publisher: Some("Chilton".to_string()),
            };
            Self {
                books: Mutex::new(vec![
                    book(DUNE, "Dune", 1965, 1),
                    book("978-0441478125", "The Left Hand of Darkness", 1969, 2),
                ]),
                authors: vec![
                    Author {
                        id: 1,
                        name: "Frank Herbert".to_string(),
                    },
                    Author {
                        id: 2,
                        name: "Ursula K. Le Guin".to_string(),
                    },
                ],
            }
        }

        fn author(&self, id: u32) -> Option<Author> {
            self.authors.iter().find(|author| author.id == id).cloned()
        }

        fn book(&self, isbn: &str) -> Option<Book> {
            self.books.lock().iter().find(|book| book.isbn == isbn).cloned()
        }
    }

    fn bookstore(store: Arc<Store>) -> RegistryBuilder {
        let builder = RegistryBuilder::new();

        let authors = store.clone();
        let books = Representor::builder::<Book>(["Book"])
            .identifier(|book| book.isbn.clone())
            .string("isbn", |book| Some(book.isbn.clone()))
            .string("title", |book| Some(book.title.clone()))
            .number("year", |book| book.year)
            .binary("cover", |book| {
                Some(BinaryFile::new(format!("cover of {}", book.title), "text/plain"))
            })
            .bidirectional_model::<Author>("author", "books", move |book| {
                authors.author(book.author_id)
            })
            .related_model::<Publisher>("publisher", |book| book.publisher.clone().map(Publisher))
            .build()
            .unwrap();

        let (created, read, listed, updated, deleted) =
            (store.clone(), store.clone(), store.clone(), store.clone(), store.clone());
        let book_routes = Routes::builder::<Book>()
            .create(move |_, values| {
                let new_book: NewBook = values.deserialize()?;
                let book = Book {
                    isbn: new_book.isbn,
                    title: new_book.title,
                    year: new_book.year,
                    author_id: new_book.author_id,
                    publisher: None,
                };
                created.books.lock().push(book.clone());
                Ok(book)
            })
            .get_item(move |_, path| Ok(Lookup::from(read.book(path.id()))))
            .get_page(move |context, parent| {
                let author_id = match parent {
                    Some(parent) => Some(parent.id().parse::<u32>().unwrap_or_default()),
                    None => None,
                };
                let books: Vec<Book> = listed
                    .books
                    .lock()
                    .iter()
                    .filter(|book| author_id.is_none_or(|id| book.author_id == id))
                    .cloned()
                    .collect();
                Ok(PageItems::paginate(books, context.pagination()))
            })
            .update(move |_, path, values| {
                let mut books = updated.books.lock();
                let Some(book) = books.iter_mut().find(|book| book.isbn == path.id()) else {
                    return Ok(Lookup::NotFound);
                };
                if let Some(title) = values.string("title") {
                    book.title = title.to_string();
                }
                Ok(Lookup::Found(book.clone()))
            })
            .delete(move |_, path| {
                let mut books = deleted.books.lock();
                let before = books.len();
                books.retain(|book| book.isbn != path.id());
                Ok(Lookup::from((books.len() < before).then_some(())))
            })
            .build();
        builder.register("books", books, book_routes);

        let author_representor = Representor::builder::<Author>(["Author"])
            .identifier(|author| author.id.to_string())
            .string("name", |author| Some(author.name.clone()))
            .build()
            .unwrap();
        let author_routes = Routes::builder::<Author>()
            .get_item(move |_, path| Ok(Lookup::from(store.author(path.parse_id()?))))
            .build();
        builder.register("authors", author_representor, author_routes);
        builder
    }

    fn service() -> HypermediaService {
        let registry = bookstore(Arc::new(Store::new())).freeze().unwrap();
        HypermediaService::builder(registry)
            .with_server_url("http://localhost:8080")
            .build()
            .unwrap()
    }

    fn get(service: &HypermediaService, path: &str) -> HttpResponse {
        service
            .handle_request(HttpRequest::new(HttpMethod::Get, path))
            .unwrap()
    }

    fn json_body(response: &HttpResponse) -> Value {
        serde_json::from_slice(response.body().as_bytes()).unwrap()
    }

    fn pretty(response: &HttpResponse) -> String {
        serde_json::to_string_pretty(&json_body(response)).unwrap()
    }

    #[test]
    fn test_book_links_its_author() {
        let response = get(&service(), &format!("/p/books/{}", DUNE));
        assert_eq!(response.status(), HttpStatusCode::Ok);
        expect![[r#"
            {
              "binaries": {
                "cover": "http://localhost:8080/b/books/978-0441013593/cover"
              },
              "fields": {
                "isbn": "978-0441013593",
                "title": "Dune",
                "year": 1965
              },
              "links": {
                "author": "http://localhost:8080/p/authors/1"
              },
              "self": "http://localhost:8080/p/books/978-0441013593",
              "types": [
                "Book"
              ]
            }"#]]
        .assert_eq(&pretty(&response));
    }

    #[test]
    fn test_book_embeds_its_author() {
        let response = get(&service(), &format!("/p/books/{}?embedded=author", DUNE));
        let document = json_body(&response);
        assert!(document.get("links").is_none());
        assert_eq!(
            document["embedded"],
            json!({
                "author": {
                    "self": "http://localhost:8080/p/authors/1",
                    "types": ["Author"],
                    "fields": {"name": "Frank Herbert"},
                    "relatedCollections": {"books": "http://localhost:8080/p/authors/1/books"}
                }
            })
        );
    }

    #[test]
    fn test_sparse_fieldset() {
        let response = get(&service(), &format!("/p/books/{}?fields[Book]=title,author", DUNE));
        let document = json_body(&response);
        assert_eq!(document["fields"], json!({"title": "Dune"}));
        assert_eq!(
            document["links"],
            json!({"author": "http://localhost:8080/p/authors/1"})
        );
    }

    #[test]
    fn test_hal_document() {
        let request = HttpRequest::new(HttpMethod::Get, format!("/p/books/{}", DUNE))
            .with_header("Accept", "application/hal+json, application/json;q=0.5");
        let response = service().handle_request(request).unwrap();
        assert_eq!(
            response.headers().get("Content-Type"),
            Some(&"application/hal+json".to_string())
        );
        assert_eq!(
            json_body(&response),
            json!({
                "isbn": DUNE,
                "title": "Dune",
                "year": 1965,
                "_links": {
                    "self": {"href": "http://localhost:8080/p/books/978-0441013593"},
                    "author": {"href": "http://localhost:8080/p/authors/1"},
                    "cover": {"href": "http://localhost:8080/b/books/978-0441013593/cover"}
                }
            })
        );
    }

    #[test]
    fn test_home_document() {
        let response = get(&service(), "/");
        assert_eq!(
            json_body(&response),
            json!({
                "self": "http://localhost:8080/",
                "links": {
                    "authors": "http://localhost:8080/p/authors",
                    "books": "http://localhost:8080/p/books"
                }
            })
        );
    }

    #[test]
    fn test_page_navigation() {
        let response = get(&service(), "/p/books?per_page=1&fields[Book]=title");
        expect![[r#"
            {
              "members": [
                {
                  "binaries": {
                    "cover": "http://localhost:8080/b/books/978-0441013593/cover"
                  },
                  "fields": {
                    "title": "Dune"
                  },
                  "self": "http://localhost:8080/p/books/978-0441013593",
                  "types": [
                    "Book"
                  ]
                }
              ],
              "numberOfItems": 1,
              "pageCount": 2,
              "pages": {
                "first": "http://localhost:8080/p/books?page=1&per_page=1",
                "last": "http://localhost:8080/p/books?page=2&per_page=1",
                "next": "http://localhost:8080/p/books?page=2&per_page=1"
              },
              "self": "http://localhost:8080/p/books?page=1&per_page=1",
              "totalItems": 2,
              "types": [
                "Collection"
              ]
            }"#]]
        .assert_eq(&pretty(&response));
    }

    #[test]
    fn test_page_far_past_the_end_is_empty() {
        let service = service();
        let response = get(&service, &format!("/p/books?page={}&per_page=2", usize::MAX));
        assert_eq!(response.status(), HttpStatusCode::Ok);
        let document = json_body(&response);
        assert_eq!(document["totalItems"], json!(2));
        assert_eq!(document["numberOfItems"], json!(0));
        assert_eq!(document["pages"].get("next"), None);
        assert_eq!(
            document["pages"]["last"],
            json!("http://localhost:8080/p/books?page=1&per_page=2")
        );
    }

    #[test]
    fn test_page_size_above_maximum_is_rejected() {
        let service = service();
        let response = get(&service, &format!("/p/books?per_page={}", usize::MAX));
        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        let detail = json_body(&response)["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("'per_page' must be at most 100"), "{}", detail);
        assert_eq!(get(&service, "/p/books?per_page=100").status(), HttpStatusCode::Ok);
    }

    #[test]
    fn test_nested_collection_is_scoped_to_parent() {
        let service = service();
        let document = json_body(&get(&service, "/p/authors/2/books?fields[Book]=title"));
        assert_eq!(document["totalItems"], json!(1));
        assert_eq!(
            document["members"][0]["fields"],
            json!({"title": "The Left Hand of Darkness"})
        );
        assert_eq!(
            document["self"],
            json!("http://localhost:8080/p/authors/2/books?page=1&per_page=30")
        );

        assert_eq!(get(&service, "/p/authors/9/books").status(), HttpStatusCode::NotFound);
        assert_eq!(get(&service, "/p/books/x/authors").status(), HttpStatusCode::NotFound);
    }

    #[test]
    fn test_create_update_delete() {
        let service = service();
        let request = HttpRequest::new(HttpMethod::Post, "/p/books")
            .with_body(r#"{"isbn": "978-0553293357", "title": "Foundation", "authorId": 1}"#);
        let response = service.handle_request(request).unwrap();
        assert_eq!(response.status(), HttpStatusCode::Created);
        assert_eq!(
            response.headers().get("Location"),
            Some(&"http://localhost:8080/p/books/978-0553293357".to_string())
        );
        assert_eq!(json_body(&response)["fields"]["title"], json!("Foundation"));

        let request = HttpRequest::new(HttpMethod::Put, "/p/books/978-0553293357")
            .with_body(r#"{"title": "Foundation and Empire"}"#);
        let response = service.handle_request(request).unwrap();
        assert_eq!(response.status(), HttpStatusCode::Ok);
        assert_eq!(
            json_body(&response)["fields"]["title"],
            json!("Foundation and Empire")
        );

        let delete = || {
            service
                .handle_request(HttpRequest::new(HttpMethod::Delete, "/p/books/978-0553293357"))
                .unwrap()
                .status()
        };
        assert_eq!(delete(), HttpStatusCode::NoContent);
        assert_eq!(delete(), HttpStatusCode::NotFound);
        assert_eq!(
            get(&service, "/p/books/978-0553293357").status(),
            HttpStatusCode::NotFound
        );
    }

    #[test]
    fn test_invalid_bodies_are_rejected() {
        let service = service();
        for body in ["not json", "[1, 2]", r#"{"isbn": "1"}"#] {
            let request = HttpRequest::new(HttpMethod::Post, "/p/books").with_body(body);
            let response = service.handle_request(request).unwrap();
            assert_eq!(response.status(), HttpStatusCode::BadRequest, "{}", body);
        }
        let request = HttpRequest::new(HttpMethod::Put, "/p/books/unknown").with_body("{}");
        assert_eq!(
            service.handle_request(request).unwrap().status(),
            HttpStatusCode::NotFound
        );
    }

    #[test]
    fn test_unsupported_operations() {
        let service = service();
        let response = get(&service, "/p/authors");
        assert_eq!(response.status(), HttpStatusCode::MethodNotAllowed);
        let detail = json_body(&response)["detail"].as_str().unwrap().to_string();
        assert!(detail.ends_with("Author does not support get page"), "{}", detail);
        let request = HttpRequest::new(HttpMethod::Delete, "/p/authors/1");
        assert_eq!(
            service.handle_request(request).unwrap().status(),
            HttpStatusCode::MethodNotAllowed
        );
    }

    #[test]
    fn test_binary_content() {
        let service = service();
        let response = get(&service, &format!("/b/books/{}/cover", DUNE));
        assert_eq!(response.status(), HttpStatusCode::Ok);
        assert_eq!(
            response.headers().get("Content-Type"),
            Some(&"text/plain".to_string())
        );
        assert_eq!(response.body().as_string().unwrap(), "cover of Dune");

        let response = get(&service, &format!("/b/books/{}/back", DUNE));
        assert_eq!(response.status(), HttpStatusCode::NotFound);
    }

    #[test]
    fn test_server_url_from_host_header() {
        let registry = bookstore(Arc::new(Store::new())).freeze().unwrap();
        let service = HypermediaService::builder(registry)
            .with_server_url_provider(Arc::new(HostHeaderServerUrl::new("http", "localhost")))
            .build()
            .unwrap();
        let request = HttpRequest::new(HttpMethod::Get, format!("/p/books/{}", DUNE))
            .with_header("Host", "books.example.com")
            .with_header("X-Forwarded-Proto", "https");
        let response = service.handle_request(request).unwrap();
        assert_eq!(
            json_body(&response)["self"],
            json!("https://books.example.com/p/books/978-0441013593")
        );
    }

    #[derive(Debug, Clone)]
    struct Person {
        id: u32,
    }

    #[test]
    fn test_self_relation_embedding_is_bounded() {
        let builder = RegistryBuilder::new();
        builder.register(
            "people",
            Representor::builder::<Person>(["Person"])
                .identifier(|person| person.id.to_string())
                .related_model::<Person>("friend", |person| Some(Person { id: person.id + 1 }))
                .build()
                .unwrap(),
            Routes::builder::<Person>()
                .get_item(|_, path| Ok(Lookup::Found(Person { id: path.parse_id()? })))
                .build(),
        );
        let config = ServerConfig {
            server_url: Some("http://h".to_string()),
            max_embed_depth: 2,
            ..ServerConfig::default()
        };
        let service = HypermediaService::builder(builder.freeze().unwrap())
            .with_config(&config)
            .build()
            .unwrap();

        let response = get(&service, "/p/people/1?embedded=friend,friend.friend,friend.friend.friend");
        let document = json_body(&response);
        let second = &document["embedded"]["friend"]["embedded"]["friend"];
        assert_eq!(second["self"], json!("http://h/p/people/3"));
        assert!(second.get("embedded").is_none());
        assert_eq!(second["links"]["friend"], json!("http://h/p/people/4"));
    }
}
