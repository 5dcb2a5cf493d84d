//! Element descriptors
//!
//! What a caller asks the host to render. Descriptors are plain data; the host
//! turns each one into an instance when it mounts.

use std::collections::BTreeMap;
use std::rc::Rc;

use fos_inspector::{SourceLocation, Value};

/// Component behind an element
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// Component keeping a public instance (and therefore state)
    Class { name: Option<String> },
    /// Stateless component
    Function { name: Option<String> },
    /// Native primitive
    Host { tag: String },
    Text(String),
    Empty,
}

impl Component {
    /// Name a tree view would show
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Class { name } | Self::Function { name } => name.as_deref(),
            Self::Host { tag } => Some(tag),
            Self::Text(_) | Self::Empty => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Class { .. } | Self::Function { .. })
    }
}

/// Element descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub component: Component,
    pub key: Option<String>,
    pub props: Value,
    /// Initial state, class components only
    pub state: Option<Value>,
    pub context: Option<Value>,
    pub children: Vec<Element>,
    pub source: Option<SourceLocation>,
}

impl Element {
    fn new(component: Component) -> Self {
        let state = matches!(component, Component::Class { .. }).then(Value::object);
        Self {
            component,
            key: None,
            props: Value::object(),
            state,
            context: None,
            children: Vec::new(),
            source: None,
        }
    }

    pub fn class(name: &str) -> Self {
        Self::new(Component::Class { name: Some(name.to_string()) })
    }

    /// Class component without a display name
    pub fn anonymous_class() -> Self {
        Self::new(Component::Class { name: None })
    }

    pub fn function(name: &str) -> Self {
        Self::new(Component::Function { name: Some(name.to_string()) })
    }

    pub fn host(tag: &str) -> Self {
        Self::new(Component::Host { tag: tag.to_string() })
    }

    pub fn text(content: &str) -> Self {
        Self::new(Component::Text(content.to_string()))
    }

    pub fn empty() -> Self {
        Self::new(Component::Empty)
    }

    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    /// Set one prop
    pub fn prop(mut self, name: &str, value: impl Into<Value>) -> Self {
        let mut props = match &self.props {
            Value::Object(map) => (**map).clone(),
            _ => BTreeMap::new(),
        };
        props.insert(name.to_string(), value.into());
        self.props = Value::Object(Rc::new(props));
        self
    }

    pub fn props(mut self, props: Value) -> Self {
        self.props = props;
        self
    }

    /// Initial state; ignored for anything but class components
    pub fn state(mut self, state: Value) -> Self {
        if matches!(self.component, Component::Class { .. }) {
            self.state = Some(state);
        }
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn source(mut self, file: &str, line: u32, column: u32) -> Self {
        self.source = Some(SourceLocation { file: file.to_string(), line, column });
        self
    }
}
