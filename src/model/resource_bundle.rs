use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexSet;

use crate::{
    error::{Error, Result},
    model::{
        BeanModel, ModelRef, TemplateHashModel, TemplateHashModelEx, TemplateMethodModel,
        TemplateModel, WrapperTemplateModel,
    },
    runtime::{HostValue, ResourceBundle},
    unwrap::unwrap,
    wrapper::ObjectWrapper,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Argument(usize),
}

/// Exposes the messages of a resource bundle as a hash. Called as a method, the first argument
/// is the key and the rest fill the `{0}`, `{1}`, ... placeholders of the message.
pub struct ResourceBundleModel {
    bundle: Arc<ResourceBundle>,
    bean: BeanModel,
    wrapper: Arc<ObjectWrapper>,
    formats: DashMap<Arc<str>, Arc<[Segment]>>,
}

impl ResourceBundleModel {
    pub fn new(bundle: Arc<ResourceBundle>, wrapper: Arc<ObjectWrapper>) -> Self {
        ResourceBundleModel {
            bean: BeanModel::new(HostValue::ResourceBundle(Arc::clone(&bundle)), Arc::clone(&wrapper)),
            bundle,
            wrapper,
            formats: DashMap::new(),
        }
    }

    pub fn bundle(&self) -> &Arc<ResourceBundle> {
        &self.bundle
    }

    fn message(&self, key: &str) -> Result<Arc<str>> {
        self.bundle
            .get_string(key)
            .map_err(|_| Error::Model(format!("no such key: {key}")))
    }

    /// Formats the message of `key` with `params`; placeholders without a parameter stay as
    /// they are.
    pub fn format(&self, key: &str, params: &[HostValue]) -> Result<String> {
        let segments = match self.formats.get(key) {
            Some(segments) => Arc::clone(&segments),
            None => {
                let message = self.message(key)?;
                let segments: Arc<[Segment]> = parse_message(&message)?.into();
                Arc::clone(&self.formats.entry(key.into()).or_insert(segments))
            }
        };
        let mut formatted = String::new();
        for segment in segments.iter() {
            match segment {
                Segment::Text(text) => formatted.push_str(text),
                Segment::Argument(index) => match params.get(*index) {
                    Some(param) => formatted.push_str(&param.to_display_string()),
                    None => formatted.push_str(&format!("{{{index}}}")),
                },
            }
        }
        Ok(formatted)
    }
}

/// Splits a message into text and `{n}` placeholders. Text between single quotes is literal,
/// `''` is a quote.
fn parse_message(message: &str) -> Result<Vec<Segment>> {
    let malformed = |reason: &str| Error::Model(format!("malformed message {message:?}: {reason}"));
    let mut segments = vec![];
    let mut text = String::new();
    let mut chars = message.chars().peekable();
    let mut quoted = false;
    while let Some(c) = chars.next() {
        match c {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                text.push('\'');
            }
            '\'' => quoted = !quoted,
            '{' if !quoted => {
                let mut argument = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => argument.push(c),
                        None => return Err(malformed("unmatched braces")),
                    }
                }
                let index = argument.split(',').next().unwrap_or_default().trim();
                let index: usize = index
                    .parse()
                    .map_err(|_| malformed(&format!("can't parse argument number {index:?}")))?;
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Argument(index));
            }
            c => text.push(c),
        }
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

impl TemplateModel for ResourceBundleModel {
    fn as_hash(&self) -> Option<&dyn TemplateHashModel> {
        Some(self)
    }

    fn as_hash_ex(&self) -> Option<&dyn TemplateHashModelEx> {
        Some(self)
    }

    fn as_method(&self) -> Option<&dyn TemplateMethodModel> {
        Some(self)
    }

    fn as_wrapper(&self) -> Option<&dyn WrapperTemplateModel> {
        Some(self)
    }
}

impl TemplateHashModel for ResourceBundleModel {
    fn get(&self, key: &str) -> Result<Option<ModelRef>> {
        let is_member = self.bean.table().get(key).is_some();
        if is_member && self.wrapper.methods_shadow_items() {
            return TemplateHashModel::get(&self.bean, key);
        }
        match self.message(key) {
            Ok(message) => Ok(self.wrapper.wrap(HostValue::String(message))),
            Err(_) if is_member => TemplateHashModel::get(&self.bean, key),
            Err(error) => Err(error),
        }
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.bundle.keys().next().is_none() && TemplateHashModel::is_empty(&self.bean)?)
    }
}

impl TemplateHashModelEx for ResourceBundleModel {
    fn size(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    fn keys(&self) -> Result<Vec<Arc<str>>> {
        let mut keys: IndexSet<Arc<str>> = TemplateHashModelEx::keys(&self.bean)?.into_iter().collect();
        keys.extend(self.bundle.keys().cloned());
        Ok(keys.into_iter().collect())
    }

    fn values(&self) -> Result<Vec<Option<ModelRef>>> {
        self.keys()?
            .iter()
            .map(|key| TemplateHashModel::get(self, key))
            .collect()
    }
}

impl TemplateMethodModel for ResourceBundleModel {
    fn exec(&self, args: &[Option<ModelRef>]) -> Result<Option<ModelRef>> {
        let Some((key, params)) = args.split_first() else {
            return Err(Error::Model("no message key was specified".to_string()));
        };
        let key = unwrap(key.as_ref())?.to_display_string();
        if params.is_empty() {
            let message = self.message(&key)?;
            return Ok(self.wrapper.wrap(HostValue::String(message)));
        }
        let params = params
            .iter()
            .map(|param| unwrap(param.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let formatted = self.format(&key, &params)?;
        Ok(self.wrapper.wrap(HostValue::string(formatted)))
    }
}

impl WrapperTemplateModel for ResourceBundleModel {
    fn wrapped_object(&self) -> HostValue {
        HostValue::ResourceBundle(Arc::clone(&self.bundle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn messages_split_into_placeholders() {
        assert_eq!(
            parse_message("Hello {0}, you have {1,number} new '{messages}' it''s").unwrap(),
            vec![
                Segment::Text("Hello ".to_string()),
                Segment::Argument(0),
                Segment::Text(", you have ".to_string()),
                Segment::Argument(1),
                Segment::Text(" new {messages} it's".to_string()),
            ]
        );
        assert!(parse_message("{x}").is_err());
        assert!(parse_message("{0").is_err());
    }
}
