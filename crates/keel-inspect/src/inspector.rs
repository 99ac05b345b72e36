//! The inspection entry point

use std::cell::RefCell;
use std::rc::Rc;

use keel_shared::{KeelConfig, SharedState};
use keel_value::{
    Depth, Exception, Formatter, InspectOptions, Object, ObjectClass, ProxyDetails, Value,
    ValueResult,
};

use crate::classify::{is_namespace_like, is_wrappable};
use crate::details::{CachedProxyDetails, ProxyDetailExtractor};
use crate::mask::{InternalFrameMasker, StackMasker};
use crate::style::stylize;
use crate::view::InspectView;

/// Placeholder text for a binding read before initialization
pub const UNINITIALIZED: &str = "<uninitialized>";

/// Marker the formatter emits when it displays a proxy
const PROXY_MARKER: &str = "Proxy [";

/// The second argument of [`Inspector::inspect`]
#[derive(Debug, Clone, Default)]
pub enum OptionsArg {
    #[default]
    Absent,
    /// Legacy form: any bare flag means "show hidden properties"
    ShowHidden,
    Options(InspectOptions),
}

impl From<InspectOptions> for OptionsArg {
    fn from(options: InspectOptions) -> Self {
        OptionsArg::Options(options)
    }
}

impl From<Option<InspectOptions>> for OptionsArg {
    fn from(options: Option<InspectOptions>) -> Self {
        options.map_or(OptionsArg::Absent, OptionsArg::Options)
    }
}

impl From<bool> for OptionsArg {
    fn from(_: bool) -> Self {
        OptionsArg::ShowHidden
    }
}

impl OptionsArg {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Bool(_)) => OptionsArg::ShowHidden,
            Some(value @ Value::Object(_)) => OptionsArg::Options(InspectOptions::from_value(value)),
            _ => OptionsArg::Absent,
        }
    }

    fn into_options(self) -> InspectOptions {
        match self {
            OptionsArg::Absent => InspectOptions::default(),
            OptionsArg::ShowHidden => InspectOptions::default().show_hidden(true),
            OptionsArg::Options(options) => options,
        }
    }
}

/// Side-effect-free value inspection on top of the host formatter
///
/// Cheap to clone; clones share the same collaborators and sentinel.
#[derive(Clone)]
pub struct Inspector(Rc<InspectorInner>);

struct InspectorInner {
    shared: Rc<SharedState>,
    details: Rc<dyn ProxyDetailExtractor>,
    masker: Rc<dyn StackMasker>,
    uninitialized: Object,
    render_uninitialized: Object,
    active: RefCell<Vec<usize>>,
}

impl Inspector {
    pub fn new(shared: Rc<SharedState>) -> Self {
        let details = Rc::new(CachedProxyDetails::new(shared.clone()));
        let masker = Rc::new(InternalFrameMasker::for_prefix(shared.clone()));
        Self::with_collaborators(shared, details, masker)
    }

    /// Inspector masking the internal-frame markers named in `config`
    pub fn from_config(shared: Rc<SharedState>, config: &KeelConfig) -> Self {
        let details = Rc::new(CachedProxyDetails::new(shared.clone()));
        let masker = Rc::new(InternalFrameMasker::new(
            shared.clone(),
            config.internal_markers(),
        ));
        Self::with_collaborators(shared, details, masker)
    }

    pub fn with_collaborators(
        shared: Rc<SharedState>,
        details: Rc<dyn ProxyDetailExtractor>,
        masker: Rc<dyn StackMasker>,
    ) -> Self {
        let (uninitialized, render_uninitialized) = uninitialized_sentinel(&shared);
        Inspector(Rc::new(InspectorInner {
            shared,
            details,
            masker,
            uninitialized,
            render_uninitialized,
            active: RefCell::new(Vec::new()),
        }))
    }

    pub fn shared(&self) -> &Rc<SharedState> {
        &self.0.shared
    }

    pub fn formatter(&self) -> &Rc<dyn Formatter> {
        self.0.shared.formatter()
    }

    /// The placeholder recorded for uninitialized namespace bindings
    pub fn uninitialized(&self) -> &Object {
        &self.0.uninitialized
    }

    /// Register this inspector's callable form as the shared inspect
    /// function and return it
    ///
    /// The function takes `(value, options | showHidden, depth)`.
    pub fn install(&self) -> Value {
        let inner = Rc::downgrade(&self.0);
        let function = Object::function("inspect", move |_this, args| {
            let inner = inner.upgrade().ok_or_else(|| {
                Exception::TypeError("inspector is no longer available".to_string())
            })?;
            let value = args.first().cloned().unwrap_or_default();
            let options = OptionsArg::from_value(args.get(1));
            let depth = args.get(2).and_then(Depth::from_value);
            Inspector(inner)
                .inspect(&value, options, depth)
                .map(Value::from)
        });
        let function = Value::Object(function);
        self.0.shared.module.set_util_inspect(function.clone());
        function
    }

    /// Render `value` as text without tripping over uninitialized module
    /// bindings or leaking proxy internals
    pub fn inspect(
        &self,
        value: &Value,
        options: impl Into<OptionsArg>,
        depth: Option<Depth>,
    ) -> ValueResult<String> {
        let mut options = options.into().into_options();
        if options.depth.is_none() {
            options.depth = depth;
        }

        let formatter = self.formatter();
        let Value::Object(object) = value else {
            return formatter.format(value, &options);
        };

        let defaults = formatter.defaults();
        let custom_inspect = options
            .custom_inspect
            .or(defaults.custom_inspect)
            .unwrap_or(true);
        let show_proxy = options
            .show_proxy
            .or(defaults.show_proxy)
            .unwrap_or(false);

        let value = self.prepare(value.clone());
        let namespace_like = is_namespace_like(object, &self.0.shared);
        if !namespace_like {
            let wrappable = is_wrappable(object, &self.0.shared);
            match formatter.format(&value, &options) {
                Ok(rendered) if !wrappable || !rendered.contains(PROXY_MARKER) => {
                    return Ok(rendered)
                }
                Ok(_) => {}
                Err(err) if wrappable => {
                    tracing::trace!(error = %err, "direct formatting failed, retrying through a view");
                }
                Err(err) => return Err(err),
            }
        }

        tracing::trace!(namespace_like, "formatting through an inspect view");
        options.custom_inspect = Some(true);
        options.show_proxy = Some(false);
        let view = self.wrap(object, options.clone(), custom_inspect, show_proxy);
        formatter.format(&Value::Object(view), &options)
    }

    /// Build a view over `object` carrying the given settings
    pub fn wrap(
        &self,
        object: &Object,
        options: InspectOptions,
        custom_inspect: bool,
        show_proxy: bool,
    ) -> Object {
        InspectView::wrap(self.clone(), object.clone(), options, custom_inspect, show_proxy)
    }

    /// Whether `object` is a view built by an inspector
    pub fn is_view(&self, object: &Object) -> bool {
        object.downcast_ref::<InspectView>().is_some()
    }

    /// `text` styled as `style_type` from the formatter's style table
    pub fn stylize(&self, text: &str, style_type: &str) -> String {
        stylize(self.formatter().styles(), text, style_type)
    }

    pub(crate) fn paint(&self, text: &str, style_type: &str, colors: bool) -> String {
        if colors {
            self.stylize(text, style_type)
        } else {
            text.to_string()
        }
    }

    /// Mask an error's stack before it reaches the formatter
    pub(crate) fn prepare(&self, value: Value) -> Value {
        if let Value::Object(object) = &value {
            if object.class() == ObjectClass::Error && !self.0.masker.is_masked(object) {
                self.0.masker.mask(object);
            }
        }
        value
    }

    pub(crate) fn proxy_details(&self, object: &Object) -> Option<ProxyDetails> {
        self.0.details.details(object)
    }

    pub(crate) fn render_uninitialized(&self, args: &[Value]) -> ValueResult<Value> {
        self.0.render_uninitialized.call(&Value::Undefined, args)
    }

    /// Mark `target` as being rendered; `None` when it already is
    pub(crate) fn enter(&self, target: &Object) -> Option<ActiveTarget<'_>> {
        let addr = target.addr();
        let mut active = self.0.active.borrow_mut();
        if active.contains(&addr) {
            return None;
        }
        active.push(addr);
        Some(ActiveTarget {
            active: &self.0.active,
            addr,
        })
    }

    /// Render a module namespace binding by binding, substituting the
    /// sentinel for bindings that cannot be read yet
    pub(crate) fn format_namespace(
        &self,
        namespace: &Object,
        options: InspectOptions,
    ) -> ValueResult<String> {
        let stand_in = Object::tagged("Module");
        for key in namespace.own_keys() {
            let Some(name) = key.as_str() else {
                continue;
            };
            match namespace.get(key.clone()) {
                Ok(value) => stand_in.put(key.clone(), value),
                Err(err) => {
                    tracing::trace!(binding = name, error = %err, "namespace binding not initialized");
                    stand_in.put(key.clone(), self.0.uninitialized.clone())
                }
            };
        }

        let rendered = self.inspect(&Value::Object(stand_in), options, None)?;
        Ok(namespace_text(&rendered))
    }

    /// Render a foreign proxy as `Proxy [ target, handler ]` with both
    /// pieces inspected through this inspector
    ///
    /// The pieces are inspected with `options` as given; only the pass over
    /// the display proxy forces custom inspection so the stand-ins run.
    pub(crate) fn format_proxy(
        &self,
        details: ProxyDetails,
        options: InspectOptions,
    ) -> ValueResult<String> {
        let display = Object::proxy(
            self.inspectable(details.target, &options),
            self.inspectable(details.handler, &options),
        );
        let mut display_options = options;
        display_options.custom_inspect = Some(true);
        self.formatter()
            .format(&Value::Object(display), &display_options)
    }

    fn inspectable(&self, piece: Object, options: &InspectOptions) -> Object {
        let inspector = self.clone();
        let options = options.clone();
        let render = Object::function("", move |_this, args| {
            let mut options = options.clone();
            if let Some(depth) = args.first().and_then(Depth::from_value) {
                options.depth = Some(depth);
            }
            inspector
                .inspect(&Value::Object(piece.clone()), options, None)
                .map(Value::from)
        });
        let stand_in = Object::plain();
        stand_in.define_hidden(self.0.shared.custom_inspect_key(), render);
        stand_in
    }
}

impl std::fmt::Debug for Inspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inspector")
            .field("key", self.0.shared.key())
            .field("active", &self.0.active.borrow().len())
            .finish()
    }
}

/// Clears a target's active mark on drop
pub(crate) struct ActiveTarget<'a> {
    active: &'a RefCell<Vec<usize>>,
    addr: usize,
}

impl Drop for ActiveTarget<'_> {
    fn drop(&mut self) {
        let mut active = self.active.borrow_mut();
        if let Some(position) = active.iter().rposition(|addr| *addr == self.addr) {
            active.remove(position);
        }
    }
}

/// `<indent>[Module] { ... }` from the rendering of a namespace stand-in
fn namespace_text(rendered: &str) -> String {
    let body = rendered.trim_start();
    let indent = &rendered[..rendered.len() - body.len()];
    match (body.find('{'), body.rfind('}')) {
        (Some(open), Some(close)) if open <= close => {
            format!("{}[Module] {}", indent, &body[open..=close])
        }
        _ => format!("{}[Module] {}", indent, body),
    }
}

fn uninitialized_sentinel(shared: &SharedState) -> (Object, Object) {
    let formatter = shared.formatter().clone();
    let render = Object::function("", move |_this, args| {
        let colors = args
            .get(1)
            .and_then(|options| InspectOptions::from_value(options).colors)
            .unwrap_or(false);
        let text = if colors {
            stylize(formatter.styles(), UNINITIALIZED, "special")
        } else {
            UNINITIALIZED.to_string()
        };
        Ok(Value::from(text))
    });
    let sentinel = Object::plain();
    sentinel.define_hidden(shared.custom_inspect_key(), render.clone());
    (sentinel, render)
}
