//! Stylesheet content: declaration values rewritten according to their property.

use futures::future::try_join_all;

use super::rewrite_references;
use crate::error::Result;
use crate::fingerprint::compute_path;
use crate::host::{ResourceHost, SourceFile};
use crate::models::{RunOutcome, Token};
use crate::patterns::ReferencePattern;
use crate::resolver::Resolver;

/// Declaration tracking while walking stylesheet tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DeclarationState {
  None,
  PendingProperty(String),
}

impl DeclarationState {
  /// Advance over `token`, returning the property owning it when it is a value.
  fn step(&mut self, token: &Token) -> Option<String> {
    match token {
      Token::CssProperty(name) => {
        *self = Self::PendingProperty(name.to_ascii_lowercase());
        None
      }
      Token::CssValue(_) => match std::mem::replace(self, Self::None) {
        Self::PendingProperty(property) => Some(property),
        Self::None => None,
      },
      Token::TagStart(_)
      | Token::TagEnd(_)
      | Token::Script(_)
      | Token::Style(_)
      | Token::Text(_)
      | Token::Comment(_)
      | Token::CssSelector(_)
      | Token::Raw(_) => None,
    }
  }
}

/// Rewrite the declarations of a stylesheet.
///
/// Virtual stylesheets (extracted inline blocks) only return their rewritten tree. Real
/// files commit the tree, let the host render it and fingerprint the rendered text.
pub async fn dispatch<H, F>(resolver: &Resolver<'_, H>, file: &mut F) -> Result<RunOutcome>
where
  H: ResourceHost + ?Sized,
  F: SourceFile + ?Sized,
{
  let mut tokens = file.ast().await?;
  rewrite_declarations(resolver, &mut tokens).await?;

  if file.is_virtual() {
    return Ok(RunOutcome {
      ast: Some(tokens),
      ..RunOutcome::default()
    });
  }

  file.set_ast(tokens.clone());
  let content = file.content().await?;
  let fingerprint = compute_path(
    resolver.host(),
    resolver.options(),
    &content,
    file.path(),
    file.origin_path(),
  )
  .await?;

  Ok(
    RunOutcome {
      ast: Some(tokens),
      ..RunOutcome::default()
    }
    .with_fingerprint(fingerprint),
  )
}

/// Rewrite every value token that follows a property token.
pub async fn rewrite_declarations<H>(resolver: &Resolver<'_, H>, tokens: &mut [Token]) -> Result<()>
where
  H: ResourceHost + ?Sized,
{
  let mut state = DeclarationState::None;
  let mut declarations: Vec<(String, &mut String)> = Vec::new();

  for token in tokens.iter_mut() {
    let Some(property) = state.step(token) else {
      continue;
    };
    if let Token::CssValue(value) = token {
      declarations.push((property, value));
    }
  }

  let rewritten = try_join_all(declarations.iter().map(|(property, value)| {
    let pattern = ReferencePattern::for_property(Some(property.as_str()));
    rewrite_references(resolver, value.as_str(), pattern)
  }))
  .await?;

  for ((_, value), text) in declarations.into_iter().zip(rewritten) {
    *value = text;
  }

  Ok(())
}
