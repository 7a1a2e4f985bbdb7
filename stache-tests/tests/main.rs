use std::collections::HashMap;

use stache::{Content, Error, Lambda, LambdaContext, ParserOptions, Partials, Template};

#[derive(Content)]
struct Post<'a> {
    title: &'a str,
    body: &'a str,
}

#[test]
fn simple_render() {
    let source = "<title>{{title}}</title><h1>{{ title }}</h1><div>{{body}}</div>";
    let tpl = Template::new(source).unwrap();

    let rendered = tpl.render(&Post {
        title: "Hello, stache!",
        body: "This is a really simple test of the rendering!",
    });

    assert_eq!(
        &rendered,
        "<title>Hello, stache!</title><h1>Hello, stache!</h1>\
         <div>This is a really simple test of the rendering!</div>"
    );
}

#[test]
fn simple_render_to_writer() {
    let source = "<title>{{title}}</title><h1>{{ title }}</h1><div>{{body}}</div>";
    let tpl = Template::new(source).unwrap();

    let mut buf = Vec::new();

    tpl.render_to_writer(
        &mut buf,
        &Post {
            title: "Hello, stache!",
            body: "This is a really simple test of the rendering!",
        },
    )
    .unwrap();

    assert_eq!(
        &buf[..],
        &b"<title>Hello, stache!</title><h1>Hello, stache!</h1>\
                            <div>This is a really simple test of the rendering!</div>"[..]
    );
}

#[test]
fn simple_render_hash_map() {
    let source = "<title>{{title}}</title><h1>{{ title }}</h1><div>{{body}}</div>";
    let tpl = Template::new(source).unwrap();

    let mut map = HashMap::new();
    map.insert("title", "Hello, stache!");
    map.insert(
        "body",
        "This is a test of rendering a template with a HashMap Content!",
    );

    let rendered = tpl.render(&map);

    assert_eq!(
        &rendered,
        "<title>Hello, stache!</title><h1>Hello, stache!</h1>\
         <div>This is a test of rendering a template with a HashMap Content!</div>"
    );
}

#[test]
fn simple_render_with_comments() {
    let source = "<title>{{! ignore me }}{{title}}</title>{{!-- nothing to look at here --}}<h1>{{ title }}</h1><div>{{body}}</div>";
    let tpl = Template::new(source).unwrap();

    let rendered = tpl.render(&Post {
        title: "Hello, stache!",
        body: "This is a really simple test of the rendering!",
    });

    assert_eq!(
        &rendered,
        "<title>Hello, stache!</title><h1>Hello, stache!</h1>\
         <div>This is a really simple test of the rendering!</div>"
    );
}

#[test]
fn escaped_vs_unescaped() {
    #[derive(Content)]
    struct Dummy {
        dummy: &'static str,
    }

    let tpl = Template::new("Escaped: {{dummy}} Unescaped: {{{dummy}}}").unwrap();

    let rendered = tpl.render(&Dummy {
        dummy: "This is a <strong>test</strong>!",
    });

    assert_eq!(
        rendered,
        "Escaped: This is a &lt;strong&gt;test&lt;/strong&gt;! \
         Unescaped: This is a <strong>test</strong>!"
    );
}

#[test]
fn escaped_vs_unescaped_ampersand() {
    #[derive(Content)]
    struct Dummy {
        dummy: &'static str,
    }

    let tpl = Template::new("Escaped: {{dummy}} Unescaped: {{&dummy}}").unwrap();

    let rendered = tpl.render(&Dummy {
        dummy: "This is a <strong>test</strong>!",
    });

    assert_eq!(
        rendered,
        "Escaped: This is a &lt;strong&gt;test&lt;/strong&gt;! \
         Unescaped: This is a <strong>test</strong>!"
    );
}

#[test]
fn sections_iterate_collections() {
    #[derive(Content)]
    struct Item {
        name: &'static str,
    }

    #[derive(Content)]
    struct List {
        items: Vec<Item>,
    }

    let tpl = Template::new("{{#items}}<li>{{name}}</li>{{/items}}").unwrap();
    let rendered = tpl.render(&List {
        items: vec![Item { name: "a" }, Item { name: "b" }],
    });

    assert_eq!(rendered, "<li>a</li><li>b</li>");
}

#[test]
fn inverted_section_renders_when_falsy() {
    #[derive(Content)]
    struct Empty {
        items: Vec<()>,
    }

    let tpl = Template::new("{{^items}}nothing here{{/items}}").unwrap();
    let rendered = tpl.render(&Empty { items: vec![] });

    assert_eq!(rendered, "nothing here");
}

#[test]
fn implicit_iterator_dot() {
    let tpl = Template::new("{{#.}}{{.}},{{/.}}").unwrap();
    let rendered = tpl.render(&vec!["a", "b", "c"]);

    assert_eq!(rendered, "a,b,c,");
}

#[test]
fn dotted_path_resolution() {
    #[derive(Content)]
    struct Address {
        city: &'static str,
    }

    #[derive(Content)]
    struct Person {
        address: Address,
    }

    let tpl = Template::new("{{address.city}}").unwrap();
    let rendered = tpl.render(&Person {
        address: Address { city: "Krakow" },
    });

    assert_eq!(rendered, "Krakow");
}

#[test]
fn len_segment_on_a_collection() {
    #[derive(Content)]
    struct List {
        items: Vec<&'static str>,
    }

    let tpl = Template::new("{{items.len}}").unwrap();
    let rendered = tpl.render(&List {
        items: vec!["a", "b", "c"],
    });

    assert_eq!(rendered, "3");
}

#[test]
fn custom_delimiters() {
    #[derive(Content)]
    struct Dummy {
        dummy: &'static str,
    }

    let tpl = Template::new("{{=<% %>=}}<%dummy%>{{not a tag}}").unwrap();
    let rendered = tpl.render(&Dummy { dummy: "hi" });

    assert_eq!(rendered, "hi{{not a tag}}");
}

#[test]
fn partials_render_through_a_shared_map() {
    #[derive(Content)]
    struct Post<'a> {
        title: &'a str,
    }

    let mut partials = Partials::new();
    partials.insert(
        "header",
        stache::Template::new("<h1>{{title}}</h1>")
            .unwrap()
            .elements()
            .to_vec(),
    );

    let tpl = Template::new("{{>header}}<p>body</p>").unwrap();
    let rendered = tpl.render_with_partials(&Post { title: "Hi" }, &partials);

    assert_eq!(rendered, "<h1>Hi</h1><p>body</p>");
}

#[test]
fn unresolved_partial_is_silently_empty() {
    let tpl = Template::new("a{{>missing}}b").unwrap();
    assert_eq!(tpl.render(&()), "ab");
}

#[test]
fn parent_block_overrides_render_the_override() {
    let mut partials = Partials::new();
    partials.insert(
        "layout",
        stache::Template::new("<body>{{$content}}default{{/content}}</body>")
            .unwrap()
            .elements()
            .to_vec(),
    );

    let tpl = Template::new("{{<layout}}{{$content}}custom{{/content}}{{/layout}}").unwrap();
    let rendered = tpl.render_with_partials(&(), &partials);

    assert_eq!(rendered, "<body>custom</body>");
}

#[test]
fn parent_without_matching_override_uses_default() {
    let mut partials = Partials::new();
    partials.insert(
        "layout",
        stache::Template::new("<body>{{$content}}default{{/content}}</body>")
            .unwrap()
            .elements()
            .to_vec(),
    );

    let tpl = Template::new("{{<layout}}{{/layout}}").unwrap();
    let rendered = tpl.render_with_partials(&(), &partials);

    assert_eq!(rendered, "<body>default</body>");
}

#[test]
fn standalone_tags_trim_their_own_line() {
    #[derive(Content)]
    struct List {
        items: Vec<&'static str>,
    }

    let source = "<ul>\n{{#items}}\n<li>{{.}}</li>\n{{/items}}\n</ul>";
    let tpl = Template::new(source).unwrap();
    let rendered = tpl.render(&List {
        items: vec!["a", "b"],
    });

    assert_eq!(rendered, "<ul>\n<li>a</li>\n<li>b</li>\n</ul>");
}

#[test]
fn lambda_reparses_its_output_escaped() {
    #[derive(Content)]
    struct Page {
        shout: Lambda<fn(&mut LambdaContext<'_>) -> Result<(), Error>>,
    }

    fn shout(ctx: &mut LambdaContext<'_>) -> Result<(), Error> {
        ctx.write("<b>loud</b>");
        Ok(())
    }

    let tpl = Template::with_options(
        "{{shout}}",
        ParserOptions::default().with_lambdas(10),
    )
    .unwrap();

    let rendered = tpl.render(&Page {
        shout: Lambda::new(shout),
    });

    assert_eq!(rendered, "&lt;b&gt;loud&lt;/b&gt;");
}

#[test]
fn json_value_renders_like_a_native_struct() {
    let value = serde_json::json!({
        "title": "Hello",
        "items": ["a", "b"],
    });

    let tpl = Template::new("{{title}}: {{#items}}{{.}},{{/items}}").unwrap();
    let rendered = tpl.render(&value);

    assert_eq!(rendered, "Hello: a,b,");
}
