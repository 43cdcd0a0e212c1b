pub const MAGIC: u32 = 0xCAFEBABE;

/// JDK 1.0.2
pub const MIN_MAJOR_VERSION: u16 = 45;
/// JDK 27
pub const MAX_MAJOR_VERSION: u16 = 71;

/// constant_pool_count is a u16 and counts from 1
pub const MAX_POOL_SLOTS: usize = u16::MAX as usize - 1;

pub mod attribute {
    pub const CODE: &str = "Code";
    pub const SIGNATURE: &str = "Signature";
    pub const INNER_CLASSES: &str = "InnerClasses";
    pub const ENCLOSING_METHOD: &str = "EnclosingMethod";
    pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
    pub const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
    pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
    pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
    pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
    pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeInvisibleParameterAnnotations";
    pub const RUNTIME_VISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeVisibleTypeAnnotations";
    pub const RUNTIME_INVISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeInvisibleTypeAnnotations";
    pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";
    pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";
    pub const RECORD: &str = "Record";
}

pub const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";
