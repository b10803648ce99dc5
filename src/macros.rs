/// A macro to create a new `LayerSpec`.
///
/// # Examples
///
/// ```
/// use apex_config::layer_spec;
/// let layer = layer_spec!("conv2d", filters = 16, kernel_size = 8, strides = 4, activation = "relu");
/// assert_eq!(layer.param_u64("filters"), Some(16));
///
/// let resize = layer_spec!("image_resize", width = 84, height = 84, scope = "image_resize");
/// assert_eq!(resize.scope.as_deref(), Some("image_resize"));
/// ```
///
/// Each `key = value` pair becomes a descriptor parameter; a string `scope` sets the
/// descriptor's scope.
#[macro_export]
macro_rules! layer_spec {
    ($kind:expr) => {
        $crate::config::LayerSpec::new($kind)
    };
    ($kind:expr, $($key:ident = $value:expr),+ $(,)?) => {
        $crate::config::LayerSpec::new($kind)
            $(.with_param(stringify!($key), $value))+
    };
}

/// A macro to create an ordered list of `LayerSpec`s.
///
/// # Examples
///
/// ```
/// use apex_config::layer_stack;
/// let layers = layer_stack![
///     ("reshape", flatten = true),
///     ("dense", units = 256, activation = "relu"),
/// ];
/// assert_eq!(layers.len(), 2);
/// assert_eq!(layers[1].units(), Some(256));
/// ```
#[macro_export]
macro_rules! layer_stack {
    ($( ($kind:expr $(, $key:ident = $value:expr)* ) ),* $(,)?) => {
        vec![$( $crate::config::LayerSpec::new($kind) $(.with_param(stringify!($key), $value))* ),*]
    };
}
