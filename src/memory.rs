//! In-memory host used by the test-suite and as a reference for host authors.
//!
//! Files live in a map keyed by logical path. Sub-invocations always open the registered
//! source, run the engine against it and keep the committed result in a separate output map,
//! so a file referenced several times in one run is processed from the same bytes each time.

use std::cell::RefCell;
use std::collections::BTreeMap;

use anyhow::anyhow;
use futures::future::LocalBoxFuture;

use crate::config::ResourceOptions;
use crate::engine::ResourceVersion;
use crate::error::{ResourceError, Result};
use crate::host::{ResourceHost, SourceFile};
use crate::models::{ArtifactBody, ContentKind, InvokeRequest, RunOutcome, Token};

#[derive(Debug, Clone)]
struct StoredFile {
  body: ArtifactBody,
  is_virtual: bool,
}

/// Host keeping every file in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
  options: ResourceOptions,
  files: RefCell<BTreeMap<String, StoredFile>>,
  outputs: RefCell<BTreeMap<String, ArtifactBody>>,
  artifacts: RefCell<Vec<String>>,
  invocations: RefCell<Vec<String>>,
}

impl MemoryHost {
  /// Create an empty host running the engine with `options`.
  pub fn new(options: ResourceOptions) -> Self {
    Self {
      options,
      ..Self::default()
    }
  }

  /// Options passed to every engine run.
  pub fn options(&self) -> &ResourceOptions {
    &self.options
  }

  /// Add or replace a physical file.
  pub fn insert(&self, path: impl Into<String>, body: ArtifactBody) {
    self.store(path.into(), body, false);
  }

  /// Add or replace a virtual file.
  pub fn insert_virtual(&self, path: impl Into<String>, body: ArtifactBody) {
    self.store(path.into(), body, true);
  }

  fn store(&self, path: String, body: ArtifactBody, is_virtual: bool) {
    self.outputs.borrow_mut().remove(&path);
    self
      .files
      .borrow_mut()
      .insert(path, StoredFile { body, is_virtual });
  }

  /// Open a file for a top-level run.
  pub fn open_path(&self, path: &str) -> Result<MemoryFile> {
    self.open(&InvokeRequest {
      path: path.to_string(),
      origin_path: None,
      depth: 0,
    })
  }

  /// Open the file named by `request`.
  pub fn open(&self, request: &InvokeRequest) -> Result<MemoryFile> {
    let files = self.files.borrow();
    let stored = files
      .get(&request.path)
      .ok_or_else(|| ResourceError::MissingFile {
        path: request.path.clone(),
      })?;

    Ok(MemoryFile {
      path: request.path.clone(),
      kind: ContentKind::detect(&request.path),
      origin_path: request.origin_path.clone(),
      is_virtual: stored.is_virtual,
      depth: request.depth,
      body: stored.body.clone(),
    })
  }

  /// Run the engine against `file`, commit the outcome and record the committed body.
  ///
  /// The registered source stays untouched; [`file`](Self::file) reports the output.
  pub async fn process(&self, file: &mut MemoryFile) -> Result<RunOutcome> {
    let outcome = ResourceVersion::new(self, &self.options).process(file).await?;
    self
      .outputs
      .borrow_mut()
      .insert(file.path.clone(), file.body.clone());
    Ok(outcome)
  }

  /// Paths registered through [`ResourceHost::add_file`], in registration order.
  pub fn artifacts(&self) -> Vec<String> {
    self.artifacts.borrow().clone()
  }

  /// Paths of every sub-invocation, in the order they were issued.
  pub fn invocations(&self) -> Vec<String> {
    self.invocations.borrow().clone()
  }

  /// Latest committed body of a file, falling back to its registered source.
  pub fn file(&self, path: &str) -> Option<ArtifactBody> {
    if let Some(output) = self.outputs.borrow().get(path) {
      return Some(output.clone());
    }
    self.source(path)
  }

  /// Body registered under `path`, as sub-invocations see it.
  pub fn source(&self, path: &str) -> Option<ArtifactBody> {
    self
      .files
      .borrow()
      .get(path)
      .map(|stored| stored.body.clone())
  }

  /// Current bytes of a file, rendering token trees.
  pub fn file_bytes(&self, path: &str) -> Option<Vec<u8>> {
    self.file(path).map(|body| body_bytes(&body))
  }
}

impl ResourceHost for MemoryHost {
  fn invoke_self(&self, request: InvokeRequest) -> LocalBoxFuture<'_, Result<RunOutcome>> {
    Box::pin(async move {
      self.invocations.borrow_mut().push(request.path.clone());
      let mut file = self.open(&request)?;
      self.process(&mut file).await
    })
  }

  fn add_file(
    &self,
    path: String,
    body: ArtifactBody,
    is_virtual: bool,
  ) -> LocalBoxFuture<'_, Result<String>> {
    Box::pin(async move {
      let mut files = self.files.borrow_mut();
      if let Some(existing) = files.get(&path)
        && body_bytes(&existing.body) != body_bytes(&body)
      {
        return Err(ResourceError::RegistryRejected {
          path,
          reason: "a different file is already registered under this path".into(),
        });
      }

      files.insert(path.clone(), StoredFile { body, is_virtual });
      let mut artifacts = self.artifacts.borrow_mut();
      if !artifacts.contains(&path) {
        artifacts.push(path.clone());
      }
      Ok(path)
    })
  }
}

/// File handle produced by [`MemoryHost::open`].
#[derive(Debug, Clone)]
pub struct MemoryFile {
  path: String,
  kind: ContentKind,
  origin_path: Option<String>,
  is_virtual: bool,
  depth: usize,
  body: ArtifactBody,
}

impl MemoryFile {
  /// Current body.
  pub fn body(&self) -> &ArtifactBody {
    &self.body
  }
}

impl SourceFile for MemoryFile {
  fn path(&self) -> &str {
    &self.path
  }

  fn kind(&self) -> ContentKind {
    self.kind
  }

  fn origin_path(&self) -> Option<&str> {
    self.origin_path.as_deref()
  }

  fn is_virtual(&self) -> bool {
    self.is_virtual
  }

  fn depth(&self) -> usize {
    self.depth
  }

  fn ast(&mut self) -> LocalBoxFuture<'_, Result<Vec<Token>>> {
    Box::pin(async move {
      match &self.body {
        ArtifactBody::Tokens(tokens) => Ok(tokens.clone()),
        ArtifactBody::Text(_) => Err(
          anyhow!(
            "{} holds unparsed text; register it with its token tree",
            self.path
          )
          .into(),
        ),
        ArtifactBody::Bytes(_) => Err(anyhow!("{} has no token tree", self.path).into()),
      }
    })
  }

  fn set_ast(&mut self, tokens: Vec<Token>) {
    self.body = ArtifactBody::Tokens(tokens);
  }

  fn content(&mut self) -> LocalBoxFuture<'_, Result<Vec<u8>>> {
    Box::pin(async move { Ok(body_bytes(&self.body)) })
  }

  fn set_content(&mut self, content: Vec<u8>) {
    self.body = ArtifactBody::Bytes(content);
  }
}

fn body_bytes(body: &ArtifactBody) -> Vec<u8> {
  match body {
    ArtifactBody::Bytes(bytes) => bytes.clone(),
    ArtifactBody::Text(text) => text.as_bytes().to_vec(),
    ArtifactBody::Tokens(tokens) => render_tokens(tokens).into_bytes(),
  }
}

/// Serialise a token tree back to text.
///
/// Comments and raw tokens are emitted verbatim, so they carry their own delimiters.
pub fn render_tokens(tokens: &[Token]) -> String {
  let mut output = String::new();
  for token in tokens {
    render_token(token, &mut output);
  }
  output
}

fn render_token(token: &Token, output: &mut String) {
  match token {
    Token::TagStart(start) => {
      output.push('<');
      output.push_str(&start.tag);
      for attr in &start.attrs {
        output.push(' ');
        output.push_str(&attr.name);
        if let Some(value) = &attr.value {
          output.push_str("=\"");
          output.push_str(value);
          output.push('"');
        }
      }
      output.push('>');
    }
    Token::TagEnd(tag) => {
      output.push_str("</");
      output.push_str(tag);
      output.push('>');
    }
    Token::Script(script) => {
      render_token(&Token::TagStart(script.start.clone()), output);
      output.push_str(&script.content);
      output.push_str("</script>");
    }
    Token::Style(style) => {
      render_token(&Token::TagStart(style.start.clone()), output);
      match &style.content.tokens {
        Some(tokens) => output.push_str(&render_tokens(tokens)),
        None => output.push_str(&style.content.value),
      }
      output.push_str("</style>");
    }
    Token::CssProperty(name) => {
      output.push_str(name);
      output.push(':');
    }
    Token::CssValue(value) => {
      output.push_str(value);
      output.push(';');
    }
    Token::Text(text) | Token::Comment(text) | Token::CssSelector(text) | Token::Raw(text) => {
      output.push_str(text);
    }
  }
}
