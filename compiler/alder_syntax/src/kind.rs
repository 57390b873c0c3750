//! Syntax node kinds.

/// Discriminant carried by every node of the concrete syntax tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SyntaxKind {
    // === Top level ===
    CompilationUnit,
    ModuleDeclaration,
    InterfaceDeclaration,
    ProgramDeclaration,
    PackageDeclaration,
    ModuleHeader,
    EmptyMember,

    // === Parameters ===
    ParameterPortList,
    ParameterDeclaration,

    // === Ports ===
    AnsiPortList,
    AnsiPortDeclaration,
    NonAnsiPortList,
    PortReference,
    ExplicitAnsiPort,
    PortDeclaration,

    // === Imports ===
    ImportDeclaration,
    PackageImportItem,

    // === Data declarations ===
    DataDeclaration,
    NetDeclaration,
    Declarator,
    EqualsValueClause,
    TypedefDeclaration,

    // === Subroutines ===
    FunctionDeclaration,
    TaskDeclaration,
    SubroutinePortList,
    SubroutinePort,

    // === Interface members ===
    ModportDeclaration,
    ModportItem,
    ModportSimplePort,

    // === Module members ===
    ContinuousAssign,
    ProceduralBlock,
    HierarchyInstantiation,
    HierarchicalInstance,
    OrderedPortConnection,
    NamedPortConnection,
    WildcardPortConnection,
    ParameterValueAssignment,
    OrderedParamAssignment,
    NamedParamAssignment,

    // === Types ===
    IntegerVectorType,
    IntegerAtomType,
    FloatingType,
    StringType,
    VoidType,
    EventType,
    EnumType,
    EnumMember,
    StructUnionType,
    StructUnionMember,
    NamedType,
    ImplicitType,
    TypeReference,

    // === Dimensions and selects ===
    VariableDimension,
    RangeDimensionSpecifier,
    QueueDimensionSpecifier,
    WildcardDimensionSpecifier,
    BitSelect,
    SimpleRangeSelect,
    AscendingRangeSelect,
    DescendingRangeSelect,
    ElementSelect,

    // === Statements ===
    ConditionalStatement,
    ElseClause,
    CaseStatement,
    StandardCaseItem,
    PatternCaseItem,
    DefaultCaseItem,
    ForeverStatement,
    LoopStatement,
    DoWhileStatement,
    ForLoopStatement,
    ForVariableDeclaration,
    ForeachLoopStatement,
    ReturnStatement,
    JumpStatement,
    TimingControlStatement,
    ProceduralAssignStatement,
    ProceduralForceStatement,
    ProceduralDeassignStatement,
    ProceduralReleaseStatement,
    DisableStatement,
    DisableForkStatement,
    SequentialBlockStatement,
    ParallelBlockStatement,
    ImmediateAssertionStatement,
    ConcurrentAssertionStatement,
    ActionBlock,
    WaitStatement,
    WaitForkStatement,
    WaitOrderStatement,
    RandCaseStatement,
    RandCaseItem,
    EmptyStatement,
    ExpressionStatement,
    NamedLabel,
    NamedBlockClause,

    // === Timing control ===
    DelayControl,
    CycleDelay,
    EventControl,
    ImplicitEventControl,
    EventExpression,
    SignalEventExpression,

    // === Patterns ===
    TaggedPattern,
    IdentifierPattern,
    WildcardPattern,
    ExpressionPattern,
    PatternGuard,

    // === Expressions ===
    IntegerLiteralExpression,
    RealLiteralExpression,
    TimeLiteralExpression,
    StringLiteralExpression,
    UnbasedUnsizedLiteralExpression,
    NullLiteralExpression,
    IdentifierName,
    SystemName,
    ScopedName,
    MemberAccessExpression,
    UnitScopeName,
    RootScopeName,
    ParenthesizedExpression,
    PrefixUnaryExpression,
    PostfixUnaryExpression,
    BinaryExpression,
    ConditionalExpression,
    AssignmentExpression,
    ConcatenationExpression,
    MultipleConcatenationExpression,
    StreamingConcatenationExpression,
    ElementSelectExpression,
    InvocationExpression,
    ArgumentList,
    OrderedArgument,
    NamedArgument,
    CastExpression,
    AssignmentPatternExpression,
    AssignmentPatternItem,
    TaggedUnionExpression,
    InsideExpression,
    RangeListExpression,
    ValueRangeExpression,

    // === Attributes ===
    AttributeInstance,
    AttributeSpec,

    /// Tokens consumed during error recovery, kept in the tree so the
    /// rendered output still covers the input.
    SkippedTokens,
}

impl SyntaxKind {
    /// Expression nodes (used by binder dispatch and tests).
    pub fn is_expression(self) -> bool {
        use SyntaxKind::*;
        matches!(
            self,
            IntegerLiteralExpression
                | RealLiteralExpression
                | TimeLiteralExpression
                | StringLiteralExpression
                | UnbasedUnsizedLiteralExpression
                | NullLiteralExpression
                | IdentifierName
                | SystemName
                | ScopedName
                | MemberAccessExpression
                | UnitScopeName
                | RootScopeName
                | ParenthesizedExpression
                | PrefixUnaryExpression
                | PostfixUnaryExpression
                | BinaryExpression
                | ConditionalExpression
                | AssignmentExpression
                | ConcatenationExpression
                | MultipleConcatenationExpression
                | StreamingConcatenationExpression
                | ElementSelectExpression
                | InvocationExpression
                | CastExpression
                | AssignmentPatternExpression
                | TaggedUnionExpression
                | InsideExpression
        )
    }

    /// Statement nodes, per the statement dispatch table.
    pub fn is_statement(self) -> bool {
        use SyntaxKind::*;
        matches!(
            self,
            ConditionalStatement
                | CaseStatement
                | ForeverStatement
                | LoopStatement
                | DoWhileStatement
                | ForLoopStatement
                | ForeachLoopStatement
                | ReturnStatement
                | JumpStatement
                | TimingControlStatement
                | ProceduralAssignStatement
                | ProceduralForceStatement
                | ProceduralDeassignStatement
                | ProceduralReleaseStatement
                | DisableStatement
                | DisableForkStatement
                | SequentialBlockStatement
                | ParallelBlockStatement
                | ImmediateAssertionStatement
                | ConcurrentAssertionStatement
                | WaitStatement
                | WaitForkStatement
                | WaitOrderStatement
                | RandCaseStatement
                | EmptyStatement
                | ExpressionStatement
        )
    }

    /// Data type nodes.
    pub fn is_data_type(self) -> bool {
        use SyntaxKind::*;
        matches!(
            self,
            IntegerVectorType
                | IntegerAtomType
                | FloatingType
                | StringType
                | VoidType
                | EventType
                | EnumType
                | StructUnionType
                | NamedType
                | ImplicitType
        )
    }
}
