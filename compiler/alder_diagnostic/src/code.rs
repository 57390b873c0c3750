//! Diagnostic codes for all compiler phases.
//!
//! Each code is a stable name with a fixed default severity and a
//! message template. The numeric form (`A####`) groups codes by phase
//! for `--explain` style lookups:
//!
//! - A0xxx: lexer
//! - A1xxx: preprocessor
//! - A2xxx: parser
//! - A3xxx: elaboration and name lookup
//! - A4xxx: types and constant evaluation

use std::fmt;

/// How serious a diagnostic is.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Severity {
    Note,
    Warning,
    Error,
    /// Compilation cannot meaningfully continue.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// Stable diagnostic identities.
///
/// Message templates use `{}` placeholders filled positionally from
/// the diagnostic's argument list by the renderer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DiagCode {
    // === Lexer (A0xxx) ===
    /// A character that cannot begin any token.
    UnexpectedCharacter,
    /// String literal not closed before end of line or file.
    UnterminatedString,
    /// Unknown escape sequence in a string literal.
    BadEscapeSequence,
    /// Block comment not closed before end of file.
    UnterminatedBlockComment,
    /// Exponent marker with no digits after it.
    MissingExponentDigits,
    /// A digit that is not valid for the literal's base.
    InvalidBaseDigit,
    /// Based literal prefix with no digits after it.
    MissingBaseDigits,
    /// An escaped identifier with no characters.
    EmptyEscapedIdentifier,

    // === Preprocessor (A1xxx) ===
    /// `` `include `` not followed by a file name.
    ExpectedIncludeFileName,
    /// The include file could not be found on any search path.
    CouldNotOpenIncludeFile,
    /// Includes nested deeper than the implementation limit.
    IncludeDepthExceeded,
    /// A directive name the preprocessor does not recognize.
    UnknownDirective,
    /// `` `else ``/`` `elsif ``/`` `endif `` without a matching `` `ifdef ``.
    UnexpectedConditionalDirective,
    /// `` `ifdef `` never closed by `` `endif ``.
    MissingEndIfDirective,
    /// `` `define ``/`` `undef ``/`` `ifdef `` not followed by a name.
    ExpectedMacroName,
    /// A function-like macro used without an argument list.
    ExpectedMacroArgs,
    /// Macro invoked with the wrong number of arguments.
    WrongMacroArgCount,
    /// A macro that expands (transitively) through itself.
    RecursiveMacro,

    // === Parser (A2xxx) ===
    /// A specific token was required.
    ExpectedToken,
    /// A statement was required.
    ExpectedStatement,
    /// An expression was required.
    ExpectedExpression,
    /// An identifier was required.
    ExpectedIdentifier,
    /// A data type was required.
    ExpectedDataType,
    /// A module/interface/package item was required.
    ExpectedMember,
    /// A case item was required.
    ExpectedCaseItem,
    /// A pattern was required.
    ExpectedPattern,
    /// A list element was required after a separator.
    ExpectedListItem,
    /// Tokens skipped during error recovery.
    SkippedTokens,
    /// A dimension specifier that is not a valid range.
    InvalidDimensionRange,

    // === Elaboration / lookup (A3xxx) ===
    /// A name declared twice in the same scope.
    DuplicateDefinition,
    /// Use of a name with no visible declaration.
    UndeclaredIdentifier,
    /// Package name in a scoped reference does not exist.
    UnknownPackage,
    /// Qualified lookup stepped into a name that is not a member.
    NotAMember,
    /// A name found through a modport that the modport does not expose.
    AccessViolation,
    /// The same name is visible through multiple wildcard imports.
    AmbiguousWildcardImport,
    /// Declaration of a name that was already used via wildcard import.
    ImportNameCollision,
    /// Instantiation of an unknown definition.
    UnknownDefinition,
    /// Named connection to a port that does not exist.
    PortDoesNotExist,
    /// The same port connected more than once.
    DuplicatePortConnection,
    /// More ordered connections than ports.
    TooManyPortConnections,
    /// Import target does not exist inside the named package.
    UnknownPackageMember,
    /// Named parameter assignment to a parameter that does not exist.
    ParameterDoesNotExist,
    /// Instances nested beyond the implementation limit (usually a
    /// module that instantiates itself).
    MaxInstanceDepthExceeded,

    // === Types / constants (A4xxx) ===
    /// Assignment target is not an lvalue.
    ExpressionNotAssignable,
    /// A constant that must be an integer was not.
    ValueMustBeIntegral,
    /// A constant that must be fully known contained X/Z bits.
    ValueMustNotBeUnknown,
    /// A constant that must be positive was zero or negative.
    ValueMustBePositive,
    /// A bit width beyond the implementation maximum.
    ValueExceedsMaxBitWidth,
    /// A constant outside the 32-bit signed range where one is needed.
    ValueOutOfRange,
    /// A dimension that must be a constant range was not.
    DimensionRequiresConstRange,
    /// A packed dimension written in abbreviated `[N]` form.
    PackedDimsRequireFullRange,
    /// An expression that must be constant was not.
    ExpressionNotConstant,
    /// Constant evaluation exceeded its step limit.
    ConstEvalExceededLimit,
    /// Enum value with unknown bits but no explicit initializer.
    EnumValueUnknownBits,
    /// Operands of incompatible types.
    BadBinaryExpression,
    /// A call to something that is not a subroutine.
    NotASubroutine,
}

impl DiagCode {
    /// Default severity for this code.
    pub fn severity(self) -> Severity {
        use DiagCode::*;
        match self {
            SkippedTokens => Severity::Note,
            ImportNameCollision => Severity::Warning,
            IncludeDepthExceeded => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Phase-grouped numeric form, e.g. `A2001`.
    pub fn number(self) -> &'static str {
        use DiagCode::*;
        match self {
            UnexpectedCharacter => "A0001",
            UnterminatedString => "A0002",
            BadEscapeSequence => "A0003",
            UnterminatedBlockComment => "A0004",
            MissingExponentDigits => "A0005",
            InvalidBaseDigit => "A0006",
            MissingBaseDigits => "A0007",
            EmptyEscapedIdentifier => "A0008",

            ExpectedIncludeFileName => "A1001",
            CouldNotOpenIncludeFile => "A1002",
            IncludeDepthExceeded => "A1003",
            UnknownDirective => "A1004",
            UnexpectedConditionalDirective => "A1005",
            MissingEndIfDirective => "A1006",
            ExpectedMacroName => "A1007",
            ExpectedMacroArgs => "A1008",
            WrongMacroArgCount => "A1009",
            RecursiveMacro => "A1010",

            ExpectedToken => "A2001",
            ExpectedStatement => "A2002",
            ExpectedExpression => "A2003",
            ExpectedIdentifier => "A2004",
            ExpectedDataType => "A2005",
            ExpectedMember => "A2006",
            ExpectedCaseItem => "A2007",
            ExpectedPattern => "A2008",
            ExpectedListItem => "A2009",
            SkippedTokens => "A2010",
            InvalidDimensionRange => "A2011",

            DuplicateDefinition => "A3001",
            UndeclaredIdentifier => "A3002",
            UnknownPackage => "A3003",
            NotAMember => "A3004",
            AccessViolation => "A3005",
            AmbiguousWildcardImport => "A3006",
            ImportNameCollision => "A3007",
            UnknownDefinition => "A3008",
            PortDoesNotExist => "A3009",
            DuplicatePortConnection => "A3010",
            TooManyPortConnections => "A3011",
            UnknownPackageMember => "A3012",
            ParameterDoesNotExist => "A3013",
            MaxInstanceDepthExceeded => "A3014",

            ExpressionNotAssignable => "A4001",
            ValueMustBeIntegral => "A4002",
            ValueMustNotBeUnknown => "A4003",
            ValueMustBePositive => "A4004",
            ValueExceedsMaxBitWidth => "A4005",
            ValueOutOfRange => "A4006",
            DimensionRequiresConstRange => "A4007",
            PackedDimsRequireFullRange => "A4008",
            ExpressionNotConstant => "A4009",
            ConstEvalExceededLimit => "A4010",
            EnumValueUnknownBits => "A4011",
            BadBinaryExpression => "A4012",
            NotASubroutine => "A4013",
        }
    }

    /// Message template with positional `{}` placeholders.
    pub fn template(self) -> &'static str {
        use DiagCode::*;
        match self {
            UnexpectedCharacter => "unexpected character '{}'",
            UnterminatedString => "unterminated string literal",
            BadEscapeSequence => "unknown escape sequence '\\{}'",
            UnterminatedBlockComment => "block comment is not closed",
            MissingExponentDigits => "expected digits after exponent",
            InvalidBaseDigit => "digit '{}' is not valid for this base",
            MissingBaseDigits => "expected digits after base specifier",
            EmptyEscapedIdentifier => "escaped identifier is empty",

            ExpectedIncludeFileName => "expected '\"' or '<' after `include",
            CouldNotOpenIncludeFile => "could not find include file '{}'",
            IncludeDepthExceeded => "includes nested too deeply",
            UnknownDirective => "unknown compiler directive '`{}'",
            UnexpectedConditionalDirective => "'`{}' without a matching `ifdef",
            MissingEndIfDirective => "'`{}' has no matching `endif",
            ExpectedMacroName => "expected a macro name",
            ExpectedMacroArgs => "macro '`{}' takes arguments; expected '('",
            WrongMacroArgCount => "macro '`{}' expects {} arguments, got {}",
            RecursiveMacro => "macro '`{}' expands through itself",

            ExpectedToken => "expected '{}'",
            ExpectedStatement => "expected a statement",
            ExpectedExpression => "expected an expression",
            ExpectedIdentifier => "expected an identifier",
            ExpectedDataType => "expected a data type",
            ExpectedMember => "expected a declaration",
            ExpectedCaseItem => "expected a case item",
            ExpectedPattern => "expected a pattern",
            ExpectedListItem => "expected another list element after '{}'",
            SkippedTokens => "skipped input while recovering from an earlier error",
            InvalidDimensionRange => "dimension is not a valid range",

            DuplicateDefinition => "'{}' is already declared in this scope",
            UndeclaredIdentifier => "use of undeclared identifier '{}'",
            UnknownPackage => "unknown package '{}'",
            NotAMember => "'{}' is not a member of '{}'",
            AccessViolation => "modport '{}' does not expose '{}'",
            AmbiguousWildcardImport => "'{}' is imported from multiple packages",
            ImportNameCollision => "'{}' was already used via a wildcard import",
            UnknownDefinition => "unknown module or interface '{}'",
            PortDoesNotExist => "'{}' has no port named '{}'",
            DuplicatePortConnection => "port '{}' is connected more than once",
            TooManyPortConnections => "too many port connections: expected {}, got {}",
            UnknownPackageMember => "package '{}' has no member named '{}'",
            ParameterDoesNotExist => "'{}' has no parameter named '{}'",
            MaxInstanceDepthExceeded => "instance hierarchy is too deep",

            ExpressionNotAssignable => "expression is not assignable",
            ValueMustBeIntegral => "value must be an integer",
            ValueMustNotBeUnknown => "value must not have any unknown bits",
            ValueMustBePositive => "value must be positive",
            ValueExceedsMaxBitWidth => "width {} exceeds the maximum of {} bits",
            ValueOutOfRange => "value {} is out of range [{}, {}]",
            DimensionRequiresConstRange => "dimension requires a constant range",
            PackedDimsRequireFullRange => "packed dimensions require a full [msb:lsb] range",
            ExpressionNotConstant => "expression is not constant",
            ConstEvalExceededLimit => "constant evaluation exceeded its step limit",
            EnumValueUnknownBits => "enum value has unknown bits",
            BadBinaryExpression => "invalid operands to binary expression",
            NotASubroutine => "'{}' is not a function or task",
        }
    }
}

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities() {
        assert_eq!(DiagCode::ExpectedStatement.severity(), Severity::Error);
        assert_eq!(DiagCode::SkippedTokens.severity(), Severity::Note);
        assert_eq!(DiagCode::ImportNameCollision.severity(), Severity::Warning);
        assert_eq!(DiagCode::IncludeDepthExceeded.severity(), Severity::Fatal);
    }

    #[test]
    fn phase_numbering() {
        assert!(DiagCode::UnterminatedString.number().starts_with("A0"));
        assert!(DiagCode::RecursiveMacro.number().starts_with("A1"));
        assert!(DiagCode::ExpectedStatement.number().starts_with("A2"));
        assert!(DiagCode::DuplicateDefinition.number().starts_with("A3"));
        assert!(DiagCode::ValueOutOfRange.number().starts_with("A4"));
    }

    #[test]
    fn stable_names_render_as_identifiers() {
        assert_eq!(
            DiagCode::DimensionRequiresConstRange.to_string(),
            "DimensionRequiresConstRange"
        );
    }
}
