//! Top-level entry point invoked by the host once per file.

use crate::config::ResourceOptions;
use crate::dispatch::{binary, markup, script, stylesheet};
use crate::error::{ResourceError, Result};
use crate::host::{ResourceHost, SourceFile};
use crate::models::{ContentKind, RunOutcome};
use crate::resolver::Resolver;

/// Deepest permitted nesting of sub-invocations.
pub const MAX_DEPTH: usize = 32;

/// Stateless resource versioning engine.
///
/// Every run starts from the supplied options and keeps nothing afterwards; identical files
/// processed concurrently are neither cached nor de-duplicated.
pub struct ResourceVersion<'a, H: ?Sized> {
  host: &'a H,
  options: &'a ResourceOptions,
}

impl<'a, H> ResourceVersion<'a, H>
where
  H: ResourceHost + ?Sized,
{
  /// Create an engine bound to `host` for one run.
  pub fn new(host: &'a H, options: &'a ResourceOptions) -> Self {
    Self { host, options }
  }

  /// Rewrite every reference in `file` and compute its final path where applicable.
  pub async fn run<F>(&self, file: &mut F) -> Result<RunOutcome>
  where
    F: SourceFile + ?Sized,
  {
    if file.depth() > MAX_DEPTH {
      return Err(ResourceError::RecursionLimit {
        path: file.path().to_string(),
        limit: MAX_DEPTH,
      });
    }

    let kind = file.kind();
    log::debug!(
      target: "resource_version::engine",
      "processing {} as {kind:?} at depth {}",
      file.path(),
      file.depth()
    );

    let resolver = Resolver::new(self.host, self.options, file.depth());
    match kind {
      ContentKind::Markup => markup::dispatch(&resolver, file).await,
      ContentKind::Script => script::dispatch(&resolver, file).await,
      ContentKind::Stylesheet => stylesheet::dispatch(&resolver, file).await,
      ContentKind::Binary => binary::dispatch(&resolver, file).await,
    }
  }

  /// Commit a run's outcome back into the file.
  ///
  /// Markup and stylesheets receive the rewritten tree, scripts their rewritten text;
  /// binaries are already final.
  pub fn update<F>(&self, file: &mut F, outcome: &RunOutcome)
  where
    F: SourceFile + ?Sized,
  {
    match file.kind() {
      ContentKind::Markup | ContentKind::Stylesheet => {
        if let Some(ast) = &outcome.ast {
          file.set_ast(ast.clone());
        }
      }
      ContentKind::Script => {
        if let Some(content) = &outcome.content {
          file.set_content(content.clone().into_bytes());
        }
      }
      ContentKind::Binary => {}
    }
  }

  /// [`run`](Self::run) followed by [`update`](Self::update).
  pub async fn process<F>(&self, file: &mut F) -> Result<RunOutcome>
  where
    F: SourceFile + ?Sized,
  {
    let outcome = self.run(file).await?;
    self.update(file, &outcome);
    Ok(outcome)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fingerprint::{content_digest, short_hash};
  use crate::memory::{MemoryHost, render_tokens};
  use crate::models::{
    ArtifactBody, Attribute, ScriptTag, StyleContent, StyleTag, TagStart, Token,
  };
  use serde_json::json;

  fn host(overrides: serde_json::Value) -> MemoryHost {
    MemoryHost::new(ResourceOptions::merged(&overrides).unwrap())
  }

  fn img(src: &str) -> Token {
    Token::TagStart(TagStart::new("img", vec![Attribute::new("src", src)]))
  }

  fn declaration(property: &str, value: &str) -> Vec<Token> {
    vec![
      Token::CssSelector("body".into()),
      Token::Raw("{".into()),
      Token::CssProperty(property.into()),
      Token::CssValue(value.into()),
      Token::Raw("}".into()),
    ]
  }

  fn tag_attr<'t>(tokens: &'t [Token], index: usize, name: &str) -> Option<&'t str> {
    match &tokens[index] {
      Token::TagStart(start) => start.attr(name),
      Token::Script(script) => script.start.attr(name),
      other => panic!("token {index} is not a start tag: {other:?}"),
    }
  }

  async fn process(host: &MemoryHost, path: &str) -> Result<RunOutcome> {
    let mut file = host.open_path(path)?;
    host.process(&mut file).await
  }

  #[tokio::test]
  async fn stylesheet_background_gets_query_version() {
    let host = host(json!({ "type": "query", "length": 5 }));
    host.insert("/a.png", ArtifactBody::Bytes(b"png bytes".to_vec()));
    host.insert(
      "/site.css",
      ArtifactBody::Tokens(declaration("background", "url(/a.png)")),
    );

    let outcome = process(&host, "/site.css").await.unwrap();

    let expected = declaration(
      "background",
      &format!("url(/a.png?v={})", short_hash(b"png bytes", 5)),
    );
    assert_eq!(outcome.ast.as_deref(), Some(expected.as_slice()));
    let rendered = render_tokens(&expected);
    assert_eq!(
      outcome.file_path,
      Some(format!("/site.css?v={}", short_hash(rendered.as_bytes(), 5)))
    );
    assert_eq!(host.file("/site.css"), Some(ArtifactBody::Tokens(expected)));
  }

  #[tokio::test]
  async fn markup_image_is_renamed_and_registered() {
    let host = host(json!({ "type": "rename" }));
    host.insert("/b.jpg", ArtifactBody::Bytes(b"jpeg".to_vec()));
    host.insert("/index.html", ArtifactBody::Tokens(vec![img("/b.jpg")]));

    let outcome = process(&host, "/index.html").await.unwrap();

    let renamed = format!("/b_{}.jpg", short_hash(b"jpeg", 5));
    let ast = outcome.ast.unwrap();
    assert_eq!(tag_attr(&ast, 0, "src"), Some(renamed.as_str()));
    assert_eq!(host.artifacts(), vec![renamed.clone()]);
    assert_eq!(host.file_bytes(&renamed), Some(b"jpeg".to_vec()));
    assert!(outcome.file_path.is_none());
  }

  #[tokio::test]
  async fn inline_style_is_extracted_and_spliced_back() {
    let host = host(json!({}));
    host.insert("/a.png", ArtifactBody::Bytes(b"png".to_vec()));
    let body = "body{background:url(/a.png);}";
    host.insert("/index.html", ArtifactBody::Tokens(vec![Token::Style(StyleTag {
      start: TagStart::new("style", Vec::new()),
      content: StyleContent {
        value: body.into(),
        tokens: Some(declaration("background", "url(/a.png)")),
      },
    })]));

    let outcome = process(&host, "/index.html").await.unwrap();

    let virtual_path = format!("{}.css", content_digest(body.as_bytes()));
    assert_eq!(host.artifacts(), vec![virtual_path.clone()]);
    assert_eq!(host.invocations(), vec![virtual_path, "/a.png".to_string()]);

    let Some(Token::Style(style)) = outcome.ast.unwrap().into_iter().next() else {
      panic!("expected style token");
    };
    assert_eq!(
      style.content.tokens,
      Some(declaration(
        "background",
        &format!("url(/a.png?v={})", short_hash(b"png", 5))
      ))
    );
    assert_eq!(style.content.value, body);
  }

  #[tokio::test]
  async fn srcset_descriptors_are_preserved() {
    let host = host(json!({}));
    host.insert("/a.jpg", ArtifactBody::Bytes(b"jpeg".to_vec()));
    host.insert("/index.html", ArtifactBody::Tokens(vec![Token::TagStart(
      TagStart::new("img", vec![Attribute::new("srcset", "/a.jpg 1x, /a.jpg 2x")]),
    )]));

    let outcome = process(&host, "/index.html").await.unwrap();

    let hash = short_hash(b"jpeg", 5);
    let ast = outcome.ast.unwrap();
    assert_eq!(
      tag_attr(&ast, 0, "srcset"),
      Some(format!("/a.jpg?v={hash} 1x, /a.jpg?v={hash} 2x").as_str())
    );
  }

  #[tokio::test]
  async fn token_order_and_kinds_are_preserved() {
    let host = host(json!({}));
    host.insert("/a.png", ArtifactBody::Bytes(b"a".to_vec()));
    host.insert("/b.png", ArtifactBody::Bytes(b"b".to_vec()));
    host.insert("/app.js", ArtifactBody::Text("run();".into()));
    let tokens = vec![
      Token::TagStart(TagStart::new("body", Vec::new())),
      img("/a.png"),
      Token::Text("hello".into()),
      Token::Script(ScriptTag {
        start: TagStart::new("script", vec![Attribute::new("src", "/app.js")]),
        content: String::new(),
      }),
      Token::Comment("<!-- note -->".into()),
      img("/b.png"),
      Token::TagEnd("body".into()),
    ];
    host.insert("/index.html", ArtifactBody::Tokens(tokens.clone()));

    let ast = process(&host, "/index.html").await.unwrap().ast.unwrap();

    assert_eq!(ast.len(), tokens.len());
    for (before, after) in tokens.iter().zip(&ast) {
      assert_eq!(
        std::mem::discriminant(before),
        std::mem::discriminant(after)
      );
    }
    assert_eq!(
      tag_attr(&ast, 1, "src"),
      Some(format!("/a.png?v={}", short_hash(b"a", 5)).as_str())
    );
    assert_eq!(
      tag_attr(&ast, 3, "src"),
      Some(format!("/app.js?v={}", short_hash(b"run();", 5)).as_str())
    );
    assert_eq!(
      tag_attr(&ast, 5, "src"),
      Some(format!("/b.png?v={}", short_hash(b"b", 5)).as_str())
    );
    assert_eq!(ast[2], Token::Text("hello".into()));
  }

  #[tokio::test]
  async fn excluded_references_skip_sub_invocation() {
    let host = host(json!({ "exclude": ["/static/vendor"] }));
    host.insert("/index.html", ArtifactBody::Tokens(vec![Token::Script(ScriptTag {
      start: TagStart::new("script", vec![Attribute::new(
        "src",
        "/static/vendor/jquery.js",
      )]),
      content: String::new(),
    })]));

    let ast = process(&host, "/index.html").await.unwrap().ast.unwrap();

    assert_eq!(tag_attr(&ast, 0, "src"), Some("/static/vendor/jquery.js"));
    assert!(host.invocations().is_empty());
  }

  #[tokio::test]
  async fn remote_references_pass_through() {
    let host = host(json!({}));
    host.insert("/index.html", ArtifactBody::Tokens(vec![
      img("https://example.com/a.png"),
      img("//cdn.example.com/b.png"),
      Token::TagStart(TagStart::new("div", vec![Attribute::new(
        "style",
        "background:url(//cdn.example.com/c.png)",
      )])),
    ]));

    let ast = process(&host, "/index.html").await.unwrap().ast.unwrap();

    assert_eq!(tag_attr(&ast, 0, "src"), Some("https://example.com/a.png"));
    assert_eq!(tag_attr(&ast, 1, "src"), Some("//cdn.example.com/b.png"));
    assert_eq!(
      tag_attr(&ast, 2, "style"),
      Some("background:url(//cdn.example.com/c.png)")
    );
    assert!(host.invocations().is_empty());
  }

  #[tokio::test]
  async fn nested_references_compose_under_rename() {
    let host = host(json!({ "type": "rename" }));
    host.insert("/fonts/icon.woff", ArtifactBody::Bytes(b"woff".to_vec()));
    host.insert(
      "/css/site.css",
      ArtifactBody::Tokens(declaration("src", "url('/fonts/icon.woff') format('woff')")),
    );
    host.insert("/index.html", ArtifactBody::Tokens(vec![Token::TagStart(
      TagStart::new("link", vec![
        Attribute::new("rel", "stylesheet"),
        Attribute::new("href", "/css/site.css"),
      ]),
    )]));

    let ast = process(&host, "/index.html").await.unwrap().ast.unwrap();

    let font = format!("/fonts/icon_{}.woff", short_hash(b"woff", 5));
    let css_tokens = declaration("src", &format!("url('{font}') format('woff')"));
    let css_text = render_tokens(&css_tokens);
    let css = format!("/css/site_{}.css", short_hash(css_text.as_bytes(), 5));

    assert_eq!(tag_attr(&ast, 0, "href"), Some(css.as_str()));
    assert_eq!(host.artifacts(), vec![font, css.clone()]);
    assert_eq!(host.file_bytes(&css), Some(css_text.into_bytes()));
  }

  #[tokio::test]
  async fn script_files_are_rewritten_and_committed() {
    let host = host(json!({}));
    host.insert("/img/a.png", ArtifactBody::Bytes(b"a".to_vec()));
    host.insert(
      "/app.js",
      ArtifactBody::Text(r#"img.src = {'cdn': '/img/a.png'}.cdn;"#.into()),
    );

    let outcome = process(&host, "/app.js").await.unwrap();

    let rewritten = format!(r#"img.src = "/img/a.png?v={}";"#, short_hash(b"a", 5));
    assert_eq!(outcome.content.as_deref(), Some(rewritten.as_str()));
    assert_eq!(
      outcome.file_path,
      Some(format!("/app.js?v={}", short_hash(rewritten.as_bytes(), 5)))
    );
    assert_eq!(host.file_bytes("/app.js"), Some(rewritten.into_bytes()));
  }

  #[tokio::test]
  async fn runs_are_deterministic() {
    let first = {
      let host = host(json!({ "type": "rename", "length": 8 }));
      host.insert("/a.png", ArtifactBody::Bytes(b"a".to_vec()));
      host.insert("/index.html", ArtifactBody::Tokens(vec![img("/a.png")]));
      process(&host, "/index.html").await.unwrap()
    };
    let second = {
      let host = host(json!({ "type": "rename", "length": 8 }));
      host.insert("/a.png", ArtifactBody::Bytes(b"a".to_vec()));
      host.insert("/index.html", ArtifactBody::Tokens(vec![img("/a.png")]));
      process(&host, "/index.html").await.unwrap()
    };

    assert_eq!(first, second);
  }

  fn link(href: &str) -> Token {
    Token::TagStart(TagStart::new("link", vec![
      Attribute::new("rel", "stylesheet"),
      Attribute::new("href", href),
    ]))
  }

  #[tokio::test]
  async fn stylesheet_linked_twice_is_renamed_once() {
    let host = host(json!({ "type": "rename" }));
    host.insert("/a.png", ArtifactBody::Bytes(b"a".to_vec()));
    host.insert(
      "/s.css",
      ArtifactBody::Tokens(declaration("background", "url(/a.png)")),
    );
    host.insert(
      "/index.html",
      ArtifactBody::Tokens(vec![link("/s.css"), link("/s.css")]),
    );

    let ast = process(&host, "/index.html").await.unwrap().ast.unwrap();

    let png = format!("/a_{}.png", short_hash(b"a", 5));
    let css_text = render_tokens(&declaration("background", &format!("url({png})")));
    let css = format!("/s_{}.css", short_hash(css_text.as_bytes(), 5));
    assert_eq!(tag_attr(&ast, 0, "href"), Some(css.as_str()));
    assert_eq!(tag_attr(&ast, 1, "href"), Some(css.as_str()));
    assert_eq!(host.artifacts(), vec![png, css]);
    assert_eq!(
      host.source("/s.css"),
      Some(ArtifactBody::Tokens(declaration("background", "url(/a.png)")))
    );
  }

  #[tokio::test]
  async fn identical_inline_styles_share_one_virtual_file() {
    let host = host(json!({}));
    host.insert("/a.png", ArtifactBody::Bytes(b"png".to_vec()));
    let body = "body{background:url(/a.png);}";
    let style = Token::Style(StyleTag {
      start: TagStart::new("style", Vec::new()),
      content: StyleContent {
        value: body.into(),
        tokens: Some(declaration("background", "url(/a.png)")),
      },
    });
    host.insert(
      "/index.html",
      ArtifactBody::Tokens(vec![style.clone(), style]),
    );

    let ast = process(&host, "/index.html").await.unwrap().ast.unwrap();

    let expected = declaration(
      "background",
      &format!("url(/a.png?v={})", short_hash(b"png", 5)),
    );
    for token in &ast {
      let Token::Style(style) = token else {
        panic!("expected style token, got {token:?}");
      };
      assert_eq!(style.content.tokens.as_ref(), Some(&expected));
    }
    let virtual_path = format!("{}.css", content_digest(body.as_bytes()));
    assert_eq!(host.artifacts(), vec![virtual_path]);
  }

  #[tokio::test]
  async fn font_suffix_is_versioned_once_per_reference() {
    let host = host(json!({}));
    host.insert("/f.eot", ArtifactBody::Bytes(b"eot".to_vec()));
    host.insert(
      "/f.css",
      ArtifactBody::Tokens(declaration("src", "url('/f.eot?#iefix')")),
    );
    host.insert(
      "/index.html",
      ArtifactBody::Tokens(vec![link("/f.css"), link("/f.css")]),
    );

    let ast = process(&host, "/index.html").await.unwrap().ast.unwrap();

    let css_tokens = declaration(
      "src",
      &format!("url('/f.eot?v={}?#iefix')", short_hash(b"eot", 5)),
    );
    let css_text = render_tokens(&css_tokens);
    let css = format!("/f.css?v={}", short_hash(css_text.as_bytes(), 5));
    assert_eq!(tag_attr(&ast, 0, "href"), Some(css.as_str()));
    assert_eq!(tag_attr(&ast, 1, "href"), Some(css.as_str()));
    assert_eq!(host.file("/f.css"), Some(ArtifactBody::Tokens(css_tokens)));
  }

  #[tokio::test]
  async fn script_included_twice_is_renamed_once() {
    let host = host(json!({ "type": "rename" }));
    host.insert("/img/a.png", ArtifactBody::Bytes(b"a".to_vec()));
    host.insert(
      "/app.js",
      ArtifactBody::Text(r#"img.src = {'cdn': '/img/a.png'}.cdn;"#.into()),
    );
    let script = Token::Script(ScriptTag {
      start: TagStart::new("script", vec![Attribute::new("src", "/app.js")]),
      content: String::new(),
    });
    host.insert(
      "/index.html",
      ArtifactBody::Tokens(vec![script.clone(), script]),
    );

    let ast = process(&host, "/index.html").await.unwrap().ast.unwrap();

    let png = format!("/img/a_{}.png", short_hash(b"a", 5));
    let rewritten = format!(r#"img.src = "{png}";"#);
    let js = format!("/app_{}.js", short_hash(rewritten.as_bytes(), 5));
    assert_eq!(tag_attr(&ast, 0, "src"), Some(js.as_str()));
    assert_eq!(tag_attr(&ast, 1, "src"), Some(js.as_str()));
    assert_eq!(host.artifacts(), vec![png, js]);
  }

  #[tokio::test]
  async fn missing_reference_fails_the_file() {
    let host = host(json!({}));
    host.insert("/index.html", ArtifactBody::Tokens(vec![img("/missing.png")]));

    let err = process(&host, "/index.html").await.unwrap_err();

    assert!(matches!(err, ResourceError::MissingFile { path } if path == "/missing.png"));
  }

  #[tokio::test]
  async fn registry_rejection_propagates() {
    let host = host(json!({ "type": "rename" }));
    host.insert("/b.jpg", ArtifactBody::Bytes(b"jpeg".to_vec()));
    host.insert(
      format!("/b_{}.jpg", short_hash(b"jpeg", 5)),
      ArtifactBody::Bytes(b"something else".to_vec()),
    );
    host.insert("/index.html", ArtifactBody::Tokens(vec![img("/b.jpg")]));

    let err = process(&host, "/index.html").await.unwrap_err();

    assert!(matches!(err, ResourceError::RegistryRejected { .. }));
  }

  #[tokio::test]
  async fn self_referencing_stylesheet_hits_recursion_limit() {
    let host = host(json!({}));
    host.insert(
      "/loop.css",
      ArtifactBody::Tokens(declaration("background", "url(/loop.css)")),
    );

    let err = process(&host, "/loop.css").await.unwrap_err();

    assert!(matches!(err, ResourceError::RecursionLimit { limit: MAX_DEPTH, .. }));
  }

  #[tokio::test]
  async fn markup_referenced_as_resource_is_incomplete() {
    let host = host(json!({ "tagAttrs": { "iframe": "src" } }));
    host.insert("/frame.html", ArtifactBody::Tokens(Vec::new()));
    host.insert("/index.html", ArtifactBody::Tokens(vec![Token::TagStart(
      TagStart::new("iframe", vec![Attribute::new("src", "/frame.html")]),
    )]));

    let err = process(&host, "/index.html").await.unwrap_err();

    assert!(matches!(err, ResourceError::IncompleteOutcome { missing: "final path", .. }));
  }

  #[tokio::test]
  async fn binary_origin_path_is_reported() {
    let host = host(json!({}));
    host.insert("/a.png", ArtifactBody::Bytes(b"a".to_vec()));
    let mut file = host
      .open(&crate::models::InvokeRequest {
        path: "/a.png".into(),
        origin_path: Some("../a.png".into()),
        depth: 1,
      })
      .unwrap();

    let outcome = host.process(&mut file).await.unwrap();

    assert_eq!(
      outcome.file_path,
      Some(format!("../a.png?v={}", short_hash(b"a", 5)))
    );
    assert_eq!(file.body(), &ArtifactBody::Bytes(b"a".to_vec()));
  }
}
